//! Administrative-privilege lifecycle coordination.
//!
//! The coordinator is the single source of truth for "do we hold the
//! privilege needed for restricted operations" and the only component
//! permitted to launch a consent flow.
//!
//! # Consent-flow correlation
//!
//! The consent flow resolves through an asynchronous platform callback. Each
//! launched flow carries a fresh [`ConsentToken`]; the pending callback slot
//! stores the token it was issued under, and a result whose token does not
//! match the slot is discarded as stale. At most one request is pending at a
//! time; a newer request supersedes the older one, whose callback is
//! resolved with `false` at replacement.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::boot::BootPersistenceBridge;
use crate::capability::CapabilityTier;
use crate::config::AgentConfig;
use crate::events::{AgentEvent, EventSink};
use crate::platform::PrivilegeBackend;

/// Correlation token carried by a privilege-consent flow.
///
/// Format: `R-{uuid}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsentToken(String);

impl ConsentToken {
    /// Generates a new random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("R-{}", Uuid::new_v4()))
    }

    /// Returns the token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback resolved with the outcome of a privilege request.
pub type PrivilegeCallback = Box<dyn FnOnce(bool) + Send>;

/// Snapshot of this application's standing with the privilege backend.
///
/// Re-derived fresh on every query; the backend is the source of truth for
/// ownership and active-privilege state across process restarts.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession {
    /// Platform capability tier.
    pub capability_tier: CapabilityTier,
    /// Whether this application holds the device-owner designation.
    pub is_device_owner: bool,
    /// Whether administrative privilege is currently active.
    pub is_admin_active: bool,
}

struct PendingRequest {
    token: ConsentToken,
    callback: PrivilegeCallback,
}

/// Owns the administrative-privilege lifecycle.
pub struct AdminPrivilegeCoordinator {
    backend: Arc<dyn PrivilegeBackend>,
    boot: Arc<BootPersistenceBridge>,
    sink: Arc<dyn EventSink>,
    consent_explanation: String,
    initialized: AtomicBool,
    pending: Mutex<Option<PendingRequest>>,
}

impl AdminPrivilegeCoordinator {
    /// Creates a coordinator over the given backend and boot bridge.
    #[must_use]
    pub fn new(
        backend: Arc<dyn PrivilegeBackend>,
        boot: Arc<BootPersistenceBridge>,
        sink: Arc<dyn EventSink>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            backend,
            boot,
            sink,
            consent_explanation: config.consent_explanation.clone(),
            initialized: AtomicBool::new(false),
            pending: Mutex::new(None),
        }
    }

    /// Initializes the coordinator. Idempotent.
    ///
    /// The host calls this from every lifecycle attach point it owns; the
    /// side effects (signal-receiver registration, replay-flag consumption)
    /// run exactly once per process lifetime.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("coordinator already initialized, skipping");
            return;
        }
        if let Err(err) = self.backend.register_system_signal_receiver() {
            warn!(error = %err, "failed to register system signal receiver");
        }
        if self.boot.on_application_cold_start() {
            info!("emitting boot resume request");
            self.sink.emit(AgentEvent::BootResumeRequested);
        }
    }

    /// Current standing with the privilege backend.
    #[must_use]
    pub fn session(&self) -> AdminSession {
        AdminSession {
            capability_tier: self.backend.capability_tier(),
            is_device_owner: self.backend.is_device_owner(),
            is_admin_active: self.backend.is_privilege_active(),
        }
    }

    /// Whether administrative privilege is currently active.
    ///
    /// Pure query against the backend; no side effects.
    #[must_use]
    pub fn is_privilege_active(&self) -> bool {
        self.backend.is_privilege_active()
    }

    /// Requests administrative privilege, resolving `callback` with the
    /// outcome.
    ///
    /// Resolves synchronously with `false` when the application is not the
    /// designated owner, and with `true` when privilege is already active.
    /// Otherwise launches the consent flow and resolves later, from
    /// [`Self::on_privilege_result`]. A request issued while another is
    /// pending supersedes it; the superseded callback resolves with `false`.
    pub fn request_privilege(&self, callback: PrivilegeCallback) {
        let session = self.session();
        if !session.is_device_owner {
            debug!("privilege request from non-owner application");
            callback(false);
            return;
        }
        if session.is_admin_active {
            debug!("privilege already active");
            callback(true);
            return;
        }

        let token = ConsentToken::generate();
        let superseded = {
            let mut pending = self.lock_pending();
            pending.replace(PendingRequest {
                token: token.clone(),
                callback,
            })
        };
        if let Some(old) = superseded {
            debug!(token = %old.token, "superseding pending privilege request");
            (old.callback)(false);
        }

        info!(token = %token, "launching privilege consent flow");
        if let Err(err) = self
            .backend
            .launch_consent_flow(&token, &self.consent_explanation)
        {
            warn!(token = %token, error = %err, "consent flow failed to launch");
            let request = {
                let mut pending = self.lock_pending();
                match pending.as_ref() {
                    Some(current) if current.token == token => pending.take(),
                    _ => None,
                }
            };
            if let Some(request) = request {
                (request.callback)(false);
            }
        }
    }

    /// Delivers a consent-flow result from the platform boundary.
    ///
    /// A result whose token does not match the pending request is discarded
    /// as stale or duplicate. The matching callback is invoked and cleared
    /// exactly once.
    pub fn on_privilege_result(&self, token: &str, granted: bool) {
        let request = {
            let mut pending = self.lock_pending();
            match pending.as_ref() {
                Some(current) if current.token.as_str() == token => pending.take(),
                _ => None,
            }
        };
        match request {
            Some(request) => {
                info!(token, granted, "privilege consent resolved");
                (request.callback)(granted);
            }
            None => debug!(token, "discarding stale consent result"),
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<PendingRequest>> {
        // The pending slot has a single logical owner; a poisoned mutex only
        // means a callback panicked mid-resolution.
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[cfg(test)]
    fn pending_token(&self) -> Option<ConsentToken> {
        self.lock_pending().as_ref().map(|p| p.token.clone())
    }
}
