//! Test doubles for exercising the coordination core without a real
//! platform.
//!
//! Every collaborator trait has a recording mock here. Mocks append to a
//! [`CallLog`]; pass one shared log to several mocks to assert cross-trait
//! call ordering (e.g. preferred-activity registration before the lock
//! primitive).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::admin::ConsentToken;
use crate::capability::CapabilityTier;
use crate::error::PolicyError;
use crate::events::{AgentEvent, EventSink};
use crate::platform::{
    CommandChannel, ComponentState, ForegroundSurface, IntentCategory, LauncherControl,
    PrivilegeBackend,
};

/// Append-only log of mock invocations.
#[derive(Debug, Default)]
pub struct CallLog {
    entries: Mutex<Vec<String>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// Returns every recorded entry in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Counts entries starting with the given prefix.
    #[must_use]
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    /// Position of the first entry starting with the given prefix.
    #[must_use]
    pub fn index_of_prefix(&self, prefix: &str) -> Option<usize> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .position(|e| e.starts_with(prefix))
    }
}

/// Recording [`EventSink`].
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every emitted event in order.
    #[must_use]
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: AgentEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Recording [`PrivilegeBackend`] with configurable standing.
pub struct MockPrivilegeBackend {
    tier: CapabilityTier,
    owner: AtomicBool,
    active: AtomicBool,
    fail_consent: AtomicBool,
    fail_registration: AtomicBool,
    fail_lock_task: AtomicBool,
    consent_tokens: Mutex<Vec<String>>,
    log: Arc<CallLog>,
}

impl MockPrivilegeBackend {
    /// Owner application with privilege already active.
    #[must_use]
    pub fn owner_active() -> Self {
        Self::with_standing(true, true)
    }

    /// Owner application without active privilege.
    #[must_use]
    pub fn owner_inactive() -> Self {
        Self::with_standing(true, false)
    }

    /// Application that is not the designated owner.
    #[must_use]
    pub fn non_owner() -> Self {
        Self::with_standing(false, false)
    }

    fn with_standing(owner: bool, active: bool) -> Self {
        Self {
            tier: CapabilityTier::AuditedWipe,
            owner: AtomicBool::new(owner),
            active: AtomicBool::new(active),
            fail_consent: AtomicBool::new(false),
            fail_registration: AtomicBool::new(false),
            fail_lock_task: AtomicBool::new(false),
            consent_tokens: Mutex::new(Vec::new()),
            log: Arc::new(CallLog::new()),
        }
    }

    /// Overrides the reported capability tier.
    #[must_use]
    pub fn with_tier(mut self, tier: CapabilityTier) -> Self {
        self.tier = tier;
        self
    }

    /// Shares a call log with other mocks.
    #[must_use]
    pub fn with_log(mut self, log: Arc<CallLog>) -> Self {
        self.log = log;
        self
    }

    /// Flips the active-privilege answer.
    pub fn set_privilege_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Makes the next consent-flow launches fail.
    pub fn fail_consent_launch(&self) {
        self.fail_consent.store(true, Ordering::SeqCst);
    }

    /// Makes preferred-activity registration fail.
    pub fn fail_preferred_registration(&self) {
        self.fail_registration.store(true, Ordering::SeqCst);
    }

    /// Makes lock-task enforcement fail.
    pub fn fail_lock_task_enforcement(&self) {
        self.fail_lock_task.store(true, Ordering::SeqCst);
    }

    /// Tokens carried by launched consent flows, in order.
    #[must_use]
    pub fn consent_tokens(&self) -> Vec<String> {
        self.consent_tokens.lock().unwrap().clone()
    }

    /// Token of the most recently launched consent flow.
    #[must_use]
    pub fn last_consent_token(&self) -> Option<String> {
        self.consent_tokens.lock().unwrap().last().cloned()
    }

    /// Number of recorded calls with the given name prefix.
    #[must_use]
    pub fn calls_named(&self, name: &str) -> usize {
        self.log.count_prefix(name)
    }

    /// The shared call log.
    #[must_use]
    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

impl PrivilegeBackend for MockPrivilegeBackend {
    fn capability_tier(&self) -> CapabilityTier {
        self.tier
    }

    fn is_device_owner(&self) -> bool {
        self.owner.load(Ordering::SeqCst)
    }

    fn is_privilege_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn launch_consent_flow(
        &self,
        token: &ConsentToken,
        _explanation: &str,
    ) -> Result<(), PolicyError> {
        self.log.record(format!("launch_consent_flow:{token}"));
        if self.fail_consent.load(Ordering::SeqCst) {
            return Err(PolicyError::refused("consent surface unavailable"));
        }
        self.consent_tokens
            .lock()
            .unwrap()
            .push(token.as_str().to_string());
        Ok(())
    }

    fn register_system_signal_receiver(&self) -> Result<(), PolicyError> {
        self.log.record("register_system_signal_receiver");
        Ok(())
    }

    fn enforce_lock_task(&self, packages: &[String]) -> Result<(), PolicyError> {
        self.log
            .record(format!("enforce_lock_task[{}]", packages.join(",")));
        if self.fail_lock_task.load(Ordering::SeqCst) {
            return Err(PolicyError::refused("lock task allowlist rejected"));
        }
        Ok(())
    }

    fn register_preferred_activity(
        &self,
        categories: &[IntentCategory],
    ) -> Result<(), PolicyError> {
        let names: Vec<&str> = categories
            .iter()
            .map(|c| match c {
                IntentCategory::Main => "main",
                IntentCategory::Default => "default",
                IntentCategory::Home => "home",
            })
            .collect();
        self.log
            .record(format!("register_preferred_activity[{}]", names.join(",")));
        if self.fail_registration.load(Ordering::SeqCst) {
            return Err(PolicyError::refused("registration rejected"));
        }
        Ok(())
    }

    fn clear_preferred_activities(&self) -> Result<(), PolicyError> {
        self.log.record("clear_preferred_activities");
        Ok(())
    }
}

/// Recording [`ForegroundSurface`] with scriptable attach/ready state.
pub struct MockSurface {
    attached: AtomicBool,
    fail_enter: AtomicBool,
    ready_callbacks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    log: Arc<CallLog>,
}

impl MockSurface {
    /// Surface already attached and laid out.
    #[must_use]
    pub fn attached() -> Self {
        Self::with_attachment(true)
    }

    /// No surface attached yet.
    #[must_use]
    pub fn detached() -> Self {
        Self::with_attachment(false)
    }

    fn with_attachment(attached: bool) -> Self {
        Self {
            attached: AtomicBool::new(attached),
            fail_enter: AtomicBool::new(false),
            ready_callbacks: Mutex::new(Vec::new()),
            log: Arc::new(CallLog::new()),
        }
    }

    /// Shares a call log with other mocks.
    #[must_use]
    pub fn with_log(mut self, log: Arc<CallLog>) -> Self {
        self.log = log;
        self
    }

    /// Makes the lock primitive refuse.
    pub fn fail_enter_lock_task(&self, fail: bool) {
        self.fail_enter.store(fail, Ordering::SeqCst);
    }

    /// Attaches the surface and fires every deferred ready callback.
    pub fn fire_ready(&self) {
        self.attached.store(true, Ordering::SeqCst);
        let callbacks: Vec<_> = std::mem::take(&mut *self.ready_callbacks.lock().unwrap());
        for callback in callbacks {
            callback();
        }
    }

    /// Number of deferred callbacks waiting for readiness.
    #[must_use]
    pub fn pending_ready_callbacks(&self) -> usize {
        self.ready_callbacks.lock().unwrap().len()
    }

    /// Number of recorded calls with the given name prefix.
    #[must_use]
    pub fn calls_named(&self, name: &str) -> usize {
        self.log.count_prefix(name)
    }
}

impl ForegroundSurface for MockSurface {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn on_ready_once(&self, callback: Box<dyn FnOnce() + Send>) {
        self.log.record("on_ready_once");
        self.ready_callbacks.lock().unwrap().push(callback);
    }

    fn enter_lock_task(&self) -> Result<(), PolicyError> {
        self.log.record("enter_lock_task");
        if self.fail_enter.load(Ordering::SeqCst) {
            return Err(PolicyError::refused("lock task refused before layout"));
        }
        Ok(())
    }

    fn exit_lock_task(&self) -> Result<(), PolicyError> {
        self.log.record("exit_lock_task");
        Ok(())
    }

    fn set_keep_awake(&self, enable: bool) -> Result<(), PolicyError> {
        if !self.is_attached() {
            return Err(PolicyError::SurfaceUnavailable);
        }
        self.log.record(format!("set_keep_awake[{enable}]"));
        Ok(())
    }
}

/// Recording [`LauncherControl`].
pub struct MockLauncher {
    fail_chooser: AtomicBool,
    log: Arc<CallLog>,
}

impl MockLauncher {
    /// Creates a launcher control that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fail_chooser: AtomicBool::new(false),
            log: Arc::new(CallLog::new()),
        }
    }

    /// Shares a call log with other mocks.
    #[must_use]
    pub fn with_log(mut self, log: Arc<CallLog>) -> Self {
        self.log = log;
        self
    }

    /// Makes the chooser presentation fail.
    pub fn fail_chooser(&self) {
        self.fail_chooser.store(true, Ordering::SeqCst);
    }

    /// Number of recorded calls with the given name prefix.
    #[must_use]
    pub fn calls_named(&self, name: &str) -> usize {
        self.log.count_prefix(name)
    }

    /// The shared call log.
    #[must_use]
    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl LauncherControl for MockLauncher {
    fn set_launcher_component(&self, state: ComponentState) -> Result<(), PolicyError> {
        let name = match state {
            ComponentState::Enabled => "enabled",
            ComponentState::Default => "default",
        };
        self.log.record(format!("set_launcher_component[{name}]"));
        Ok(())
    }

    fn show_launcher_chooser(&self) -> Result<(), PolicyError> {
        self.log.record("show_launcher_chooser");
        if self.fail_chooser.load(Ordering::SeqCst) {
            return Err(PolicyError::refused("chooser unavailable"));
        }
        Ok(())
    }

    fn clear_preferred_entries(&self) -> Result<(), PolicyError> {
        self.log.record("clear_preferred_entries");
        Ok(())
    }

    fn open_system_home(&self) -> Result<(), PolicyError> {
        self.log.record("open_system_home");
        Ok(())
    }

    fn open_application(&self) -> Result<(), PolicyError> {
        self.log.record("open_application");
        Ok(())
    }
}

/// Scriptable [`CommandChannel`].
pub struct MockCommandChannel {
    reachable: AtomicBool,
    log: Arc<CallLog>,
}

impl MockCommandChannel {
    /// Creates a channel with the given reachability.
    #[must_use]
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
            log: Arc::new(CallLog::new()),
        }
    }

    /// Number of delivery attempts observed.
    #[must_use]
    pub fn notify_count(&self) -> usize {
        self.log.count_prefix("notify_boot_resume")
    }
}

impl CommandChannel for MockCommandChannel {
    fn notify_boot_resume(&self) -> Result<(), PolicyError> {
        self.log.record("notify_boot_resume");
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PolicyError::refused("no live environment"))
        }
    }
}
