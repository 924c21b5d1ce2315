//! Collaborator traits at the platform boundary.
//!
//! The coordination core never talks to the platform directly; it talks to
//! these seams. Hosts implement them over the real device-management
//! subsystem, the visible application surface, and the package manager.
//! [`crate::testing`] provides recording doubles for all of them.
//!
//! ```text
//! AdminPrivilegeCoordinator ──► PrivilegeBackend
//! KioskLockStateMachine ──────► PrivilegeBackend + ForegroundSurface
//!                               + LauncherControl
//! BootPersistenceBridge ──────► CommandChannel (best-effort fast path)
//! ```

use crate::admin::ConsentToken;
use crate::capability::CapabilityTier;
use crate::error::PolicyError;

/// Intent categories used when registering a preferred activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentCategory {
    /// The main entry-point category.
    Main,
    /// The default category attached to every registration.
    Default,
    /// The home/launcher category; routes the home intent to this app.
    Home,
}

/// Requested enablement state for the application's launcher component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    /// Force-enable the component.
    Enabled,
    /// Restore the component to its manifest-declared default.
    Default,
}

/// The platform subsystem granting elevated device-management rights.
///
/// All operations that require privilege or a capability tier live behind
/// this trait. The consent flow is fire-and-forget: its result is delivered
/// later through `AdminPrivilegeCoordinator::on_privilege_result`.
pub trait PrivilegeBackend: Send + Sync {
    /// The platform capability tier. Fixed for the process lifetime.
    fn capability_tier(&self) -> CapabilityTier;

    /// Whether this application is the designated device-owner-class app.
    fn is_device_owner(&self) -> bool;

    /// Whether administrative privilege is currently active.
    fn is_privilege_active(&self) -> bool;

    /// Launches the privilege-consent flow, carrying the correlation token.
    ///
    /// Returns once the flow is presented; the grant/deny result arrives
    /// asynchronously.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the flow cannot be presented.
    fn launch_consent_flow(
        &self,
        token: &ConsentToken,
        explanation: &str,
    ) -> Result<(), PolicyError>;

    /// Registers the platform receiver for administrative system signals.
    ///
    /// Called exactly once per process, from coordinator initialization.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when registration is refused.
    fn register_system_signal_receiver(&self) -> Result<(), PolicyError>;

    /// Restricts task switching to the given package set.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses the restriction.
    fn enforce_lock_task(&self, packages: &[String]) -> Result<(), PolicyError>;

    /// Registers this application's surface as the persistent preferred
    /// activity for the given intent categories.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when registration is refused.
    fn register_preferred_activity(
        &self,
        categories: &[IntentCategory],
    ) -> Result<(), PolicyError>;

    /// Clears every persistent preferred-activity registration held by this
    /// application.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses the clear.
    fn clear_preferred_activities(&self) -> Result<(), PolicyError>;
}

/// The current visible application surface, if any.
///
/// Implementations wrap whatever surface the host currently has attached;
/// `is_attached` reflects attach/detach over time.
pub trait ForegroundSurface: Send + Sync {
    /// Whether a surface is currently attached.
    fn is_attached(&self) -> bool;

    /// Registers a single deferred callback invoked once the surface's view
    /// hierarchy is laid out and ready. One-shot; not a poll loop.
    fn on_ready_once(&self, callback: Box<dyn FnOnce() + Send>);

    /// Enters kiosk/lock-task mode.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::PrimitiveRefused`] when the platform refuses,
    /// which it is documented to do when called before layout completes or
    /// when the caller is not the allowed foreground task.
    fn enter_lock_task(&self) -> Result<(), PolicyError>;

    /// Exits kiosk/lock-task mode.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the platform refuses the exit.
    fn exit_lock_task(&self) -> Result<(), PolicyError>;

    /// Toggles the keep-screen-awake window flag on the attached surface.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::SurfaceUnavailable`] when no surface is
    /// attached.
    fn set_keep_awake(&self, enable: bool) -> Result<(), PolicyError>;
}

/// Unprivileged launcher-preference plumbing.
///
/// Used for the best-effort launcher nudge when privilege is absent: no
/// durable registration is available, so the preference is achieved by a
/// component-enable dance plus a one-shot chooser.
pub trait LauncherControl: Send + Sync {
    /// Sets the enablement state of this application's launcher component.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the package manager refuses.
    fn set_launcher_component(&self, state: ComponentState) -> Result<(), PolicyError>;

    /// Presents the platform's launcher-selection surface.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the chooser cannot be presented.
    fn show_launcher_chooser(&self) -> Result<(), PolicyError>;

    /// Clears this application's non-persistent preferred-activity entries.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the package manager refuses.
    fn clear_preferred_entries(&self) -> Result<(), PolicyError>;

    /// Opens the home intent so the system falls back to the default
    /// launcher.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the home intent cannot be dispatched.
    fn open_system_home(&self) -> Result<(), PolicyError>;

    /// Brings this application's surface to the foreground.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when no launchable entry point exists.
    fn open_application(&self) -> Result<(), PolicyError>;
}

/// Best-effort synchronous channel into a running application environment.
///
/// The boot signal handler uses this as a fast path when the main
/// environment happens to be reachable. Failure is expected and harmless;
/// the durable replay flag is the fallback.
pub trait CommandChannel: Send + Sync {
    /// Delivers an immediate boot-resume notification.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when no environment is reachable.
    fn notify_boot_resume(&self) -> Result<(), PolicyError>;
}
