//! One-shot device-policy passthroughs.
//!
//! Unlike the lock and privilege coordinators these carry no internal state
//! machine: each call gates on the capability matrix and forwards to the
//! platform. They share the backend's error vocabulary so the bridge maps
//! them uniformly.

use std::collections::HashMap;
use std::sync::Arc;

use dpc_core::capability::{CapabilityTier, GatedOperation};
use dpc_core::error::PolicyError;
use dpc_core::platform::ForegroundSurface;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Device inventory report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device model name.
    pub model: String,
    /// Device manufacturer.
    pub manufacturer: String,
    /// Consumer brand.
    pub brand: String,
    /// Product code.
    pub product: String,
    /// Internal device name.
    pub device: String,
    /// Board identifier.
    pub board: String,
    /// Display build identifier.
    pub display: String,
    /// Hardware revision.
    pub hardware: String,
    /// Build identifier.
    pub build_id: String,
    /// Build fingerprint.
    pub fingerprint: String,
    /// Hardware serial, when the platform exposes it.
    pub serial: String,
    /// Human-readable platform release.
    pub os_release: String,
}

/// Platform surface for the one-shot policy wrappers.
pub trait PolicyBackend: Send + Sync {
    /// Applies an application restriction bundle to a package.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn set_application_restrictions(
        &self,
        package: &str,
        restrictions: &HashMap<String, String>,
    ) -> Result<(), PolicyError>;

    /// Reads the restriction bundle applied to a package.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn get_application_restrictions(
        &self,
        package: &str,
    ) -> Result<HashMap<String, String>, PolicyError>;

    /// Adds user restrictions by key.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn add_user_restrictions(&self, restrictions: &[String]) -> Result<(), PolicyError>;

    /// Clears user restrictions by key.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn clear_user_restrictions(&self, restrictions: &[String]) -> Result<(), PolicyError>;

    /// Locks the device screen immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn lock_now(&self) -> Result<(), PolicyError>;

    /// Resets the unlock credential using a pre-provisioned token.
    ///
    /// Returns whether the reset (or token provisioning, when no token was
    /// active yet) took effect.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn reset_credential_with_token(&self, credential: &str) -> Result<bool, PolicyError>;

    /// Reboots the device.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn reboot(&self, reason: Option<&str>) -> Result<(), PolicyError>;

    /// Wipes the device. The reason is only passed on platforms that audit
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn wipe(&self, flags: u32, reason: Option<&str>) -> Result<(), PolicyError>;

    /// Reports the device inventory.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn device_info(&self) -> Result<DeviceInfo, PolicyError>;

    /// Disables or re-enables the keyguard.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn set_keyguard_disabled(&self, disabled: bool) -> Result<(), PolicyError>;

    /// Disables or re-enables the camera.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn set_camera_disabled(&self, disabled: bool) -> Result<(), PolicyError>;

    /// Disables or re-enables screen capture.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn set_screen_capture_disabled(&self, disabled: bool) -> Result<(), PolicyError>;

    /// Hands a package-install request to the platform installer.
    ///
    /// Returns whether an installer surface accepted the handoff.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the request cannot be constructed.
    fn request_package_install(&self, source: &str) -> Result<bool, PolicyError>;

    /// Relinquishes the device-owner designation for a package.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses.
    fn clear_device_owner(&self, package: &str) -> Result<(), PolicyError>;
}

/// Tier-gated facade over [`PolicyBackend`].
pub struct PolicyPassthrough {
    backend: Arc<dyn PolicyBackend>,
    surface: Arc<dyn ForegroundSurface>,
    tier: CapabilityTier,
    package: String,
}

impl PolicyPassthrough {
    /// Creates a passthrough for the given package at the given tier.
    #[must_use]
    pub fn new(
        backend: Arc<dyn PolicyBackend>,
        surface: Arc<dyn ForegroundSurface>,
        tier: CapabilityTier,
        package: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            surface,
            tier,
            package: package.into(),
        }
    }

    /// Applies an application restriction bundle.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] below the restriction
    /// tier, or the backend's refusal.
    pub fn set_application_restrictions(
        &self,
        package: &str,
        restrictions: &HashMap<String, String>,
    ) -> Result<(), PolicyError> {
        self.tier.require(GatedOperation::ApplicationRestrictions)?;
        self.backend.set_application_restrictions(package, restrictions)
    }

    /// Reads a package's restriction bundle.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] below the restriction
    /// tier, or the backend's refusal.
    pub fn get_application_restrictions(
        &self,
        package: &str,
    ) -> Result<HashMap<String, String>, PolicyError> {
        self.tier.require(GatedOperation::ApplicationRestrictions)?;
        self.backend.get_application_restrictions(package)
    }

    /// Adds user restrictions.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] below the restriction
    /// tier, or the backend's refusal.
    pub fn add_user_restrictions(&self, restrictions: &[String]) -> Result<(), PolicyError> {
        self.tier.require(GatedOperation::UserRestrictions)?;
        self.backend.add_user_restrictions(restrictions)
    }

    /// Clears user restrictions.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] below the restriction
    /// tier, or the backend's refusal.
    pub fn clear_user_restrictions(&self, restrictions: &[String]) -> Result<(), PolicyError> {
        self.tier.require(GatedOperation::UserRestrictions)?;
        self.backend.clear_user_restrictions(restrictions)
    }

    /// Locks the device screen, optionally resetting the credential first.
    ///
    /// Without a credential the screen locks immediately. With one, the
    /// reset goes through the token path, which only exists at the
    /// credential-token tier.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] for a credential reset
    /// below the token tier, or the backend's refusal.
    pub fn lock_device(&self, credential: Option<&str>) -> Result<bool, PolicyError> {
        match credential {
            Some(credential) if !credential.is_empty() => {
                self.tier.require(GatedOperation::CredentialReset)?;
                self.backend.reset_credential_with_token(credential)
            }
            _ => {
                self.backend.lock_now()?;
                Ok(true)
            }
        }
    }

    /// Reboots the device.
    ///
    /// # Errors
    ///
    /// Returns the backend's refusal.
    pub fn reboot(&self, reason: Option<&str>) -> Result<(), PolicyError> {
        self.backend.reboot(reason)
    }

    /// Wipes the device.
    ///
    /// The audit reason is dropped below the audited-wipe tier rather than
    /// refused, matching the platform's own fallback.
    ///
    /// # Errors
    ///
    /// Returns the backend's refusal.
    pub fn wipe(&self, flags: u32, reason: Option<&str>) -> Result<(), PolicyError> {
        let reason = if self.tier.supports(GatedOperation::ScopedWipeReason) {
            reason
        } else {
            if reason.is_some() {
                debug!("dropping wipe reason below the audited-wipe tier");
            }
            None
        };
        self.backend.wipe(flags, reason)
    }

    /// Reports the device inventory.
    ///
    /// # Errors
    ///
    /// Returns the backend's refusal.
    pub fn device_info(&self) -> Result<DeviceInfo, PolicyError> {
        self.backend.device_info()
    }

    /// Disables or re-enables the keyguard.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] below the runtime
    /// policy tier, or the backend's refusal.
    pub fn set_keyguard_disabled(&self, disabled: bool) -> Result<(), PolicyError> {
        self.tier.require(GatedOperation::KeyguardToggle)?;
        self.backend.set_keyguard_disabled(disabled)
    }

    /// Disables or re-enables the camera.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] below the runtime
    /// policy tier, or the backend's refusal.
    pub fn set_camera_disabled(&self, disabled: bool) -> Result<(), PolicyError> {
        self.tier.require(GatedOperation::CameraToggle)?;
        self.backend.set_camera_disabled(disabled)
    }

    /// Disables or re-enables screen capture.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] below the screen
    /// capture tier, or the backend's refusal.
    pub fn set_screen_capture_disabled(&self, disabled: bool) -> Result<(), PolicyError> {
        self.tier.require(GatedOperation::ScreenCaptureToggle)?;
        self.backend.set_screen_capture_disabled(disabled)
    }

    /// Toggles the keep-screen-awake flag on the attached surface.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::SurfaceUnavailable`] when no surface is
    /// attached.
    pub fn set_keep_screen_awake(&self, enable: bool) -> Result<(), PolicyError> {
        if !self.surface.is_attached() {
            return Err(PolicyError::SurfaceUnavailable);
        }
        self.surface.set_keep_awake(enable)
    }

    /// Hands a package-install request to the platform installer.
    ///
    /// # Errors
    ///
    /// Returns the backend's refusal.
    pub fn install_package(&self, source: &str) -> Result<bool, PolicyError> {
        self.backend.request_package_install(source)
    }

    /// Relinquishes the device-owner designation, defaulting to this
    /// application's own package.
    ///
    /// # Errors
    ///
    /// Returns the backend's refusal.
    pub fn clear_device_owner(&self, package: Option<&str>) -> Result<(), PolicyError> {
        self.backend
            .clear_device_owner(package.unwrap_or(&self.package))
    }
}
