//! Kiosk lock and launcher-preference state machine.
//!
//! Owns the locked/unlocked and launcher/non-launcher state and is the only
//! component that touches the foreground surface for lock purposes.
//!
//! # Transitions
//!
//! ```text
//!            lock(), surface attached, primitive ok
//! Unlocked ─────────────────────────────────────────► Locked
//!     │                                                  │
//!     │ lock(), no surface attached                      │ unlock()
//!     ▼                                                  ▼
//!  Locking ── deferred attempt ok ──► Locked          Unlocked
//!     │
//!     └── deferred attempt refused ──► Unlocked   (fails open)
//!
//! any state ── capability tier below minimum ──► Unavailable
//! ```
//!
//! The lock primitive is documented to refuse when the caller is not already
//! the registered foreground task, so preferred-activity registration and
//! the task allowlist are applied *before* the primitive is invoked.
//!
//! `Unavailable` is terminal for the current capability tier but not for the
//! process: it is re-evaluated when a surface attaches, since privilege can
//! change between attachments.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::capability::{CapabilityTier, GatedOperation};
use crate::error::PolicyError;
use crate::flags::{FlagStore, KEY_RELOCK_AT_BOOT};
use crate::platform::{
    ComponentState, ForegroundSurface, IntentCategory, LauncherControl, PrivilegeBackend,
};

/// Observable lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Not in kiosk mode.
    Unlocked,
    /// A deferred lock attempt is waiting for the surface to become ready.
    Locking,
    /// Kiosk mode engaged.
    Locked,
    /// The capability tier does not support kiosk mode.
    Unavailable,
}

/// Observable launcher preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherPreference {
    /// The system's default launcher handles the home intent.
    SystemDefault,
    /// This application is registered (or nudged) as the home target.
    ThisAppPreferred,
}

/// How a lock request is proceeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockProgress {
    /// The primitive succeeded synchronously; state is `Locked`.
    Engaged,
    /// The attempt was deferred until the surface reports ready; state is
    /// `Locking` and will resolve to `Locked` or `Unlocked`.
    Deferred,
}

struct LockInner {
    state: LockState,
    launcher: LauncherPreference,
}

/// Drives [`LockState`] and [`LauncherPreference`] transitions.
pub struct KioskLockStateMachine {
    backend: Arc<dyn PrivilegeBackend>,
    surface: Arc<dyn ForegroundSurface>,
    launcher: Arc<dyn LauncherControl>,
    store: Arc<dyn FlagStore>,
    tier: CapabilityTier,
    packages: Vec<String>,
    inner: Arc<Mutex<LockInner>>,
}

impl KioskLockStateMachine {
    /// Creates a state machine for the given package.
    ///
    /// The capability tier is captured once, here; it cannot change for the
    /// lifetime of the process.
    #[must_use]
    pub fn new(
        backend: Arc<dyn PrivilegeBackend>,
        surface: Arc<dyn ForegroundSurface>,
        launcher: Arc<dyn LauncherControl>,
        store: Arc<dyn FlagStore>,
        package: impl Into<String>,
    ) -> Self {
        let tier = backend.capability_tier();
        Self {
            backend,
            surface,
            launcher,
            store,
            tier,
            packages: vec![package.into()],
            inner: Arc::new(Mutex::new(LockInner {
                state: LockState::Unlocked,
                launcher: LauncherPreference::SystemDefault,
            })),
        }
    }

    /// Current lock state.
    #[must_use]
    pub fn state(&self) -> LockState {
        self.lock_inner().state
    }

    /// Current launcher preference.
    #[must_use]
    pub fn launcher_preference(&self) -> LauncherPreference {
        self.lock_inner().launcher
    }

    /// Whether kiosk mode is currently engaged.
    ///
    /// `Locking` reports `false`: the deferred attempt has not succeeded yet.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state() == LockState::Locked
    }

    /// Enters kiosk mode, registering this application as the home target
    /// when `home` is set and privilege allows.
    ///
    /// With a surface attached the primitive is attempted synchronously.
    /// Without one, the attempt is deferred (one shot) until the surface
    /// reports ready, and `Ok(LockProgress::Deferred)` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] below the task-pinning
    /// tier and [`PolicyError::PrimitiveRefused`] when the platform refuses
    /// a synchronous attempt; a refused attempt leaves the state `Unlocked`.
    pub fn lock(&self, home: bool) -> Result<LockProgress, PolicyError> {
        if let Err(err) = self.tier.require(GatedOperation::EnterLockTask) {
            warn!(tier = ?self.tier, "kiosk mode unavailable at this capability tier");
            self.lock_inner().state = LockState::Unavailable;
            return Err(err);
        }

        let privileged = self.backend.is_privilege_active();
        if privileged {
            // Registration and the task allowlist must precede the primitive.
            self.backend
                .register_preferred_activity(Self::categories(home))?;
            self.backend.enforce_lock_task(&self.packages)?;
        }

        if self.surface.is_attached() {
            match self.surface.enter_lock_task() {
                Ok(()) => {
                    self.note_locked(&mut self.lock_inner(), privileged, home);
                    Ok(LockProgress::Engaged)
                }
                Err(err) => {
                    warn!(error = %err, "lock primitive refused, staying unlocked");
                    self.lock_inner().state = LockState::Unlocked;
                    Err(err)
                }
            }
        } else {
            debug!("no surface attached, deferring lock attempt");
            self.lock_inner().state = LockState::Locking;
            self.defer_lock_attempt(privileged, home);
            Ok(LockProgress::Deferred)
        }
    }

    /// Exits kiosk mode and clears the launcher preference.
    ///
    /// Never refused: the reset runs regardless of privilege state so the
    /// device can always escape kiosk mode, even after privilege was revoked
    /// mid-session. Individual platform refusals are logged and skipped.
    pub fn unlock(&self) {
        if self.surface.is_attached() {
            if let Err(err) = self.surface.exit_lock_task() {
                warn!(error = %err, "lock-task exit refused");
            }
        } else {
            debug!("no surface attached, skipping lock-task exit");
        }
        self.clear_launcher_preference();
        let mut inner = self.lock_inner();
        inner.state = LockState::Unlocked;
        inner.launcher = LauncherPreference::SystemDefault;
        info!("kiosk mode cleared");
    }

    /// Toggles the launcher preference.
    ///
    /// Idempotent against the observed state: when the requested preference
    /// already holds, reports success without touching the platform. With
    /// privilege active the toggle is a durable preferred-activity
    /// registration; without it, enabling is a best-effort, non-durable
    /// nudge through the component-enable dance and the platform chooser.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::CapabilityUnsupported`] when the privileged
    /// registration path is requested below the task-pinning tier, and any
    /// [`PolicyError`] the platform raises for the toggle itself.
    pub fn set_launcher(&self, enable: bool) -> Result<(), PolicyError> {
        {
            let inner = self.lock_inner();
            let already = inner.launcher == LauncherPreference::ThisAppPreferred;
            if already == enable {
                debug!(enable, "launcher preference already in requested state");
                return Ok(());
            }
        }

        if self.backend.is_privilege_active() {
            if enable {
                self.tier
                    .require(GatedOperation::RegisterPreferredActivity)?;
                self.backend.register_preferred_activity(&[
                    IntentCategory::Main,
                    IntentCategory::Default,
                    IntentCategory::Home,
                ])?;
                self.lock_inner().launcher = LauncherPreference::ThisAppPreferred;
                info!("registered as persistent home target");
            } else {
                if self
                    .tier
                    .supports(GatedOperation::RegisterPreferredActivity)
                {
                    self.backend.clear_preferred_activities()?;
                }
                self.set_relock_flag(false);
                self.lock_inner().launcher = LauncherPreference::SystemDefault;
                info!("cleared persistent home registration");
            }
        } else if enable {
            // No durable registration without privilege: re-enable the
            // launcher component, present the chooser, restore the component.
            self.launcher
                .set_launcher_component(ComponentState::Enabled)?;
            let chooser = self.launcher.show_launcher_chooser();
            if let Err(err) = self
                .launcher
                .set_launcher_component(ComponentState::Default)
            {
                warn!(error = %err, "failed to restore launcher component state");
            }
            chooser?;
            self.lock_inner().launcher = LauncherPreference::ThisAppPreferred;
            info!("launcher nudge presented");
        } else {
            self.launcher.clear_preferred_entries()?;
            self.launcher.open_system_home()?;
            self.set_relock_flag(false);
            self.lock_inner().launcher = LauncherPreference::SystemDefault;
            info!("launcher preference released to system default");
        }
        Ok(())
    }

    /// Re-evaluates availability when a surface attaches.
    ///
    /// Queries the backend fresh: privilege may have been granted or revoked
    /// since the tier was last found insufficient.
    pub fn on_surface_attached(&self) {
        let mut inner = self.lock_inner();
        if inner.state == LockState::Unavailable
            && self
                .backend
                .capability_tier()
                .supports(GatedOperation::EnterLockTask)
        {
            debug!("capability re-evaluated on surface attach, leaving Unavailable");
            inner.state = LockState::Unlocked;
        }
    }

    fn categories(home: bool) -> &'static [IntentCategory] {
        if home {
            &[
                IntentCategory::Main,
                IntentCategory::Default,
                IntentCategory::Home,
            ]
        } else {
            &[IntentCategory::Main, IntentCategory::Default]
        }
    }

    fn defer_lock_attempt(&self, privileged: bool, home: bool) {
        let inner = Arc::clone(&self.inner);
        let surface = Arc::clone(&self.surface);
        let store = Arc::clone(&self.store);
        self.surface.on_ready_once(Box::new(move || {
            let mut guard = match inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match surface.enter_lock_task() {
                Ok(()) => {
                    guard.state = LockState::Locked;
                    if privileged {
                        if home {
                            guard.launcher = LauncherPreference::ThisAppPreferred;
                        }
                        if let Err(err) = store.set_bool(KEY_RELOCK_AT_BOOT, true) {
                            warn!(error = %err, "failed to persist relock policy flag");
                        }
                    }
                    info!("deferred lock attempt succeeded");
                }
                Err(err) => {
                    // Fail open: never claim to be locked when the
                    // primitive refused.
                    guard.state = LockState::Unlocked;
                    warn!(error = %err, "deferred lock attempt refused, reverting to unlocked");
                }
            }
        }));
    }

    fn note_locked(&self, inner: &mut MutexGuard<'_, LockInner>, privileged: bool, home: bool) {
        inner.state = LockState::Locked;
        if privileged {
            if home {
                inner.launcher = LauncherPreference::ThisAppPreferred;
            }
            self.set_relock_flag(true);
        }
        info!(home, privileged, "kiosk mode engaged");
    }

    fn clear_launcher_preference(&self) {
        // Unlock is a full reset: every clearing step runs regardless of
        // privilege, and refusals are non-fatal.
        if let Err(err) = self
            .launcher
            .set_launcher_component(ComponentState::Default)
        {
            warn!(error = %err, "failed to restore launcher component state");
        }
        if let Err(err) = self.launcher.clear_preferred_entries() {
            warn!(error = %err, "failed to clear preferred entries");
        }
        if self
            .tier
            .supports(GatedOperation::RegisterPreferredActivity)
        {
            if let Err(err) = self.backend.clear_preferred_activities() {
                warn!(error = %err, "failed to clear persistent registrations");
            }
        }
        self.set_relock_flag(false);
    }

    fn set_relock_flag(&self, value: bool) {
        if let Err(err) = self.store.set_bool(KEY_RELOCK_AT_BOOT, value) {
            warn!(value, error = %err, "failed to persist relock policy flag");
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, LockInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[cfg(test)]
    fn force_state(&self, state: LockState, launcher: LauncherPreference) {
        let mut inner = self.lock_inner();
        inner.state = state;
        inner.launcher = launcher;
    }
}
