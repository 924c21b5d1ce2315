//! Inbound command bridge.
//!
//! The UI layer ships requests into the core through a method-call bridge;
//! the wire transport is out of scope here, so the bridge begins at the
//! typed request. Every request resolves to exactly one response through the
//! supplied responder, possibly after the calling context has moved on (the
//! privilege-consent flow resolves asynchronously).
//!
//! ```text
//! payload ──► BridgeRequest ──► CommandBridge::dispatch ──► handler
//!                                                             │
//!                              responder ◄── BridgeResponse ──┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use dpc_core::admin::AdminPrivilegeCoordinator;
use dpc_core::error::PolicyError;
use dpc_core::lock::KioskLockStateMachine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::policy::PolicyPassthrough;

/// Typed inbound request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", content = "args", rename_all = "snake_case")]
pub enum BridgeRequest {
    /// Request administrative privilege; resolves with the grant outcome.
    RequestPrivilege,
    /// Enter kiosk mode, optionally registering as the home target.
    Lock {
        /// Whether to register as the home target.
        #[serde(default)]
        home: bool,
    },
    /// Exit kiosk mode and release the launcher preference.
    Unlock,
    /// Toggle the launcher preference.
    SetLauncher {
        /// Requested preference state.
        enable: bool,
    },
    /// Whether kiosk mode is currently engaged.
    IsLocked,
    /// Whether administrative privilege is currently active.
    IsPrivilegeActive,
    /// Apply an application restriction bundle.
    SetApplicationRestrictions {
        /// Target package.
        package: String,
        /// Restriction bundle.
        restrictions: HashMap<String, String>,
    },
    /// Read a package's restriction bundle.
    GetApplicationRestrictions {
        /// Target package.
        package: String,
    },
    /// Add user restrictions.
    AddUserRestrictions {
        /// Restriction keys.
        restrictions: Vec<String>,
    },
    /// Clear user restrictions.
    ClearUserRestrictions {
        /// Restriction keys.
        restrictions: Vec<String>,
    },
    /// Lock the device screen, optionally resetting the credential.
    LockDevice {
        /// Credential for the token reset path; `None` locks immediately.
        #[serde(default)]
        credential: Option<String>,
    },
    /// Reboot the device.
    RebootDevice {
        /// Optional reboot reason.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Wipe the device.
    WipeData {
        /// Platform wipe flags.
        #[serde(default)]
        flags: u32,
        /// Optional audit reason.
        #[serde(default)]
        reason: Option<String>,
    },
    /// Report the device inventory.
    GetDeviceInfo,
    /// Toggle the keep-screen-awake flag.
    SetKeepScreenAwake {
        /// Requested state.
        enable: bool,
    },
    /// Disable or re-enable the keyguard.
    SetKeyguardDisabled {
        /// Requested state.
        disabled: bool,
    },
    /// Disable or re-enable screen capture.
    SetScreenCaptureDisabled {
        /// Requested state.
        disabled: bool,
    },
    /// Disable or re-enable the camera.
    SetCameraDisabled {
        /// Requested state.
        disabled: bool,
    },
    /// Hand a package-install request to the platform installer.
    InstallApplication {
        /// Install source location.
        source: String,
    },
    /// Relinquish the device-owner designation.
    ClearDeviceOwner {
        /// Target package; defaults to this application.
        #[serde(default)]
        package: Option<String>,
    },
}

impl BridgeRequest {
    /// Wire name of the request's method.
    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::RequestPrivilege => "request_privilege",
            Self::Lock { .. } => "lock",
            Self::Unlock => "unlock",
            Self::SetLauncher { .. } => "set_launcher",
            Self::IsLocked => "is_locked",
            Self::IsPrivilegeActive => "is_privilege_active",
            Self::SetApplicationRestrictions { .. } => "set_application_restrictions",
            Self::GetApplicationRestrictions { .. } => "get_application_restrictions",
            Self::AddUserRestrictions { .. } => "add_user_restrictions",
            Self::ClearUserRestrictions { .. } => "clear_user_restrictions",
            Self::LockDevice { .. } => "lock_device",
            Self::RebootDevice { .. } => "reboot_device",
            Self::WipeData { .. } => "wipe_data",
            Self::GetDeviceInfo => "get_device_info",
            Self::SetKeepScreenAwake { .. } => "set_keep_screen_awake",
            Self::SetKeyguardDisabled { .. } => "set_keyguard_disabled",
            Self::SetScreenCaptureDisabled { .. } => "set_screen_capture_disabled",
            Self::SetCameraDisabled { .. } => "set_camera_disabled",
            Self::InstallApplication { .. } => "install_application",
            Self::ClearDeviceOwner { .. } => "clear_device_owner",
        }
    }
}

/// Typed outbound response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BridgeResponse {
    /// The request succeeded.
    Ok {
        /// Optional result payload.
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<serde_json::Value>,
    },
    /// The request failed.
    Error {
        /// Stable machine-readable code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}

impl BridgeResponse {
    /// Success without a payload.
    #[must_use]
    pub const fn ok_empty() -> Self {
        Self::Ok { value: None }
    }

    /// Success with a boolean payload.
    #[must_use]
    pub const fn ok_bool(value: bool) -> Self {
        Self::Ok {
            value: Some(serde_json::Value::Bool(value)),
        }
    }

    /// Success with an arbitrary payload.
    #[must_use]
    pub const fn ok_value(value: serde_json::Value) -> Self {
        Self::Ok { value: Some(value) }
    }

    /// Failure derived from a policy error.
    #[must_use]
    pub fn from_error(err: &PolicyError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Failure for an unparseable or unknown request.
    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Error {
            code: "UNSUPPORTED_REQUEST".to_string(),
            message: message.into(),
        }
    }
}

/// Responder resolved exactly once per dispatched request.
pub type Responder = Box<dyn FnOnce(BridgeResponse) + Send>;

/// Dispatches typed requests to the coordinators.
pub struct CommandBridge {
    admin: Arc<AdminPrivilegeCoordinator>,
    lock: Arc<KioskLockStateMachine>,
    policy: Arc<PolicyPassthrough>,
}

impl CommandBridge {
    /// Creates a bridge over the given coordinators.
    #[must_use]
    pub fn new(
        admin: Arc<AdminPrivilegeCoordinator>,
        lock: Arc<KioskLockStateMachine>,
        policy: Arc<PolicyPassthrough>,
    ) -> Self {
        Self {
            admin,
            lock,
            policy,
        }
    }

    /// Parses a JSON payload and dispatches it.
    ///
    /// An unparseable payload resolves the responder with an
    /// `UNSUPPORTED_REQUEST` error rather than failing the transport.
    pub fn dispatch_json(&self, payload: &str, respond: Responder) {
        match serde_json::from_str::<BridgeRequest>(payload) {
            Ok(request) => self.dispatch(request, respond),
            Err(err) => {
                warn!(error = %err, "rejecting unparseable bridge payload");
                respond(BridgeResponse::unsupported(err.to_string()));
            }
        }
    }

    /// Dispatches a typed request, resolving `respond` exactly once.
    pub fn dispatch(&self, request: BridgeRequest, respond: Responder) {
        // Log the method only: request arguments can carry credentials.
        debug!(method = request.method_name(), "dispatching bridge request");
        match request {
            BridgeRequest::RequestPrivilege => {
                self.admin.request_privilege(Box::new(move |granted| {
                    respond(BridgeResponse::ok_bool(granted));
                }));
            }
            BridgeRequest::Lock { home } => {
                respond(match self.lock.lock(home) {
                    Ok(_) => BridgeResponse::ok_bool(true),
                    Err(
                        err @ (PolicyError::PrimitiveRefused { .. }
                        | PolicyError::SurfaceUnavailable),
                    ) => {
                        debug!(error = %err, "lock attempt refused");
                        BridgeResponse::ok_bool(false)
                    }
                    Err(err) => BridgeResponse::from_error(&err),
                });
            }
            BridgeRequest::Unlock => {
                self.lock.unlock();
                respond(BridgeResponse::ok_bool(true));
            }
            BridgeRequest::SetLauncher { enable } => {
                respond(match self.lock.set_launcher(enable) {
                    Ok(()) => BridgeResponse::ok_bool(true),
                    Err(err @ PolicyError::PrimitiveRefused { .. }) => {
                        debug!(error = %err, "launcher toggle refused");
                        BridgeResponse::ok_bool(false)
                    }
                    Err(err) => BridgeResponse::from_error(&err),
                });
            }
            BridgeRequest::IsLocked => {
                respond(BridgeResponse::ok_bool(self.lock.is_locked()));
            }
            BridgeRequest::IsPrivilegeActive => {
                respond(BridgeResponse::ok_bool(self.admin.is_privilege_active()));
            }
            BridgeRequest::SetApplicationRestrictions {
                package,
                restrictions,
            } => {
                respond(Self::unit_response(
                    self.policy.set_application_restrictions(&package, &restrictions),
                ));
            }
            BridgeRequest::GetApplicationRestrictions { package } => {
                respond(match self.policy.get_application_restrictions(&package) {
                    Ok(restrictions) => match serde_json::to_value(restrictions) {
                        Ok(value) => BridgeResponse::ok_value(value),
                        Err(err) => BridgeResponse::unsupported(err.to_string()),
                    },
                    Err(err) => BridgeResponse::from_error(&err),
                });
            }
            BridgeRequest::AddUserRestrictions { restrictions } => {
                respond(Self::unit_response(
                    self.policy.add_user_restrictions(&restrictions),
                ));
            }
            BridgeRequest::ClearUserRestrictions { restrictions } => {
                respond(Self::unit_response(
                    self.policy.clear_user_restrictions(&restrictions),
                ));
            }
            BridgeRequest::LockDevice { credential } => {
                respond(match self.policy.lock_device(credential.as_deref()) {
                    Ok(done) => BridgeResponse::ok_bool(done),
                    Err(err) => BridgeResponse::from_error(&err),
                });
            }
            BridgeRequest::RebootDevice { reason } => {
                respond(Self::unit_response(self.policy.reboot(reason.as_deref())));
            }
            BridgeRequest::WipeData { flags, reason } => {
                respond(Self::unit_response(
                    self.policy.wipe(flags, reason.as_deref()),
                ));
            }
            BridgeRequest::GetDeviceInfo => {
                respond(match self.policy.device_info() {
                    Ok(info) => match serde_json::to_value(info) {
                        Ok(value) => BridgeResponse::ok_value(value),
                        Err(err) => BridgeResponse::unsupported(err.to_string()),
                    },
                    Err(err) => BridgeResponse::from_error(&err),
                });
            }
            BridgeRequest::SetKeepScreenAwake { enable } => {
                respond(Self::unit_response(
                    self.policy.set_keep_screen_awake(enable),
                ));
            }
            BridgeRequest::SetKeyguardDisabled { disabled } => {
                respond(Self::unit_response(
                    self.policy.set_keyguard_disabled(disabled),
                ));
            }
            BridgeRequest::SetScreenCaptureDisabled { disabled } => {
                respond(Self::unit_response(
                    self.policy.set_screen_capture_disabled(disabled),
                ));
            }
            BridgeRequest::SetCameraDisabled { disabled } => {
                respond(Self::unit_response(
                    self.policy.set_camera_disabled(disabled),
                ));
            }
            BridgeRequest::InstallApplication { source } => {
                respond(match self.policy.install_package(&source) {
                    Ok(accepted) => BridgeResponse::ok_bool(accepted),
                    Err(err) => BridgeResponse::from_error(&err),
                });
            }
            BridgeRequest::ClearDeviceOwner { package } => {
                respond(Self::unit_response(
                    self.policy.clear_device_owner(package.as_deref()),
                ));
            }
        }
    }

    fn unit_response(result: Result<(), PolicyError>) -> BridgeResponse {
        match result {
            Ok(()) => BridgeResponse::ok_empty(),
            Err(err) => BridgeResponse::from_error(&err),
        }
    }
}
