//! Boot-signal persistence bridge.
//!
//! The boot-completed signal is delivered on a short-lived system context
//! with no application surface alive, possibly before one ever existed this
//! boot. This bridge records the event durably and replays it once, on the
//! next cold start of the application.
//!
//! ```text
//! boot signal ──► replay flag := true ──► (best-effort channel notify)
//!                      │
//!                      │  process cold-starts later
//!                      ▼
//! on_application_cold_start ──► take-and-clear ──► replay requested once
//! ```
//!
//! The replay flag is the *event* ("a boot happened before we could act");
//! the relock-at-boot flag owned by the lock state machine is the *policy*
//! ("this device should be a kiosk"). This bridge only ever touches the
//! event flag.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::flags::{FlagStore, KEY_BOOT_REPLAY_PENDING};
use crate::platform::CommandChannel;

/// Bridges the gap between the boot signal and the next application start.
pub struct BootPersistenceBridge {
    store: Arc<dyn FlagStore>,
    channel: Option<Arc<dyn CommandChannel>>,
    resume_actions: HashSet<String>,
}

impl BootPersistenceBridge {
    /// Creates a bridge over the given store, accepting the configured
    /// resume actions.
    #[must_use]
    pub fn new(store: Arc<dyn FlagStore>, config: &AgentConfig) -> Self {
        Self {
            store,
            channel: None,
            resume_actions: config.resume_actions.iter().cloned().collect(),
        }
    }

    /// Attaches a best-effort command channel used as the boot fast path.
    #[must_use]
    pub fn with_channel(mut self, channel: Arc<dyn CommandChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Handles a system broadcast delivered outside any application surface.
    ///
    /// Returns whether the action was accepted as a resume trigger. The
    /// durable flag is written first; the channel notification is
    /// opportunistic and its failure does not affect the flag.
    pub fn on_boot_signal(&self, action: &str) -> bool {
        if !self.resume_actions.contains(action) {
            debug!(action, "ignoring broadcast outside resume allowlist");
            return false;
        }
        info!(action, "boot signal received, persisting resume intent");
        if let Err(err) = self.store.set_bool(KEY_BOOT_REPLAY_PENDING, true) {
            warn!(error = %err, "failed to persist boot replay flag");
        }
        if let Some(channel) = &self.channel {
            match channel.notify_boot_resume() {
                Ok(()) => debug!("boot resume delivered over live channel"),
                Err(err) => debug!(error = %err, "boot fast path unreachable"),
            }
        }
        true
    }

    /// Consumes the persisted replay flag on application cold start.
    ///
    /// Reads and clears the flag in one atomic step, so a crash after the
    /// clear cannot cause duplicate replay and a concurrent cold start
    /// observes the flag already cleared. Returns whether a replay is due.
    pub fn on_application_cold_start(&self) -> bool {
        match self.store.take_bool_and_clear(KEY_BOOT_REPLAY_PENDING) {
            Ok(true) => {
                info!("boot replay flag consumed");
                true
            }
            Ok(false) => false,
            Err(err) => {
                // Failing open here could replay twice on the next start;
                // failing closed only costs one missed relock.
                warn!(error = %err, "failed to read boot replay flag, skipping replay");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;
    use crate::flags::InMemoryFlagStore;
    use std::sync::Mutex;

    struct RecordingChannel {
        reachable: bool,
        calls: Mutex<u32>,
    }

    impl CommandChannel for RecordingChannel {
        fn notify_boot_resume(&self) -> Result<(), PolicyError> {
            *self.calls.lock().unwrap() += 1;
            if self.reachable {
                Ok(())
            } else {
                Err(PolicyError::refused("no live environment"))
            }
        }
    }

    fn config() -> AgentConfig {
        AgentConfig::for_package("com.example.kiosk")
    }

    #[test]
    fn test_unlisted_action_is_ignored() {
        let store = Arc::new(InMemoryFlagStore::new());
        let bridge = BootPersistenceBridge::new(store.clone(), &config());
        assert!(!bridge.on_boot_signal("vendor.scanner.DOCKED"));
        assert!(!store.get_bool(KEY_BOOT_REPLAY_PENDING, false).unwrap());
    }

    #[test]
    fn test_boot_signal_persists_flag() {
        let store = Arc::new(InMemoryFlagStore::new());
        let bridge = BootPersistenceBridge::new(store.clone(), &config());
        assert!(bridge.on_boot_signal("boot_completed"));
        assert!(store.get_bool(KEY_BOOT_REPLAY_PENDING, false).unwrap());
    }

    #[test]
    fn test_vendor_action_from_config_is_accepted() {
        let store = Arc::new(InMemoryFlagStore::new());
        let mut cfg = config();
        cfg.resume_actions.push("vendor.scanner.WARM_BOOT".to_string());
        let bridge = BootPersistenceBridge::new(store.clone(), &cfg);
        assert!(bridge.on_boot_signal("vendor.scanner.WARM_BOOT"));
    }

    #[test]
    fn test_unreachable_channel_does_not_affect_flag() {
        let store = Arc::new(InMemoryFlagStore::new());
        let channel = Arc::new(RecordingChannel {
            reachable: false,
            calls: Mutex::new(0),
        });
        let bridge =
            BootPersistenceBridge::new(store.clone(), &config()).with_channel(channel.clone());
        assert!(bridge.on_boot_signal("boot_completed"));
        assert_eq!(*channel.calls.lock().unwrap(), 1);
        assert!(store.get_bool(KEY_BOOT_REPLAY_PENDING, false).unwrap());
    }

    #[test]
    fn test_cold_start_consumes_flag_once() {
        let store = Arc::new(InMemoryFlagStore::new());
        let bridge = BootPersistenceBridge::new(store.clone(), &config());
        bridge.on_boot_signal("boot_completed");
        assert!(bridge.on_application_cold_start());
        assert!(!bridge.on_application_cold_start());
    }

    #[test]
    fn test_cold_start_without_boot_is_a_noop() {
        let store = Arc::new(InMemoryFlagStore::new());
        let bridge = BootPersistenceBridge::new(store, &config());
        assert!(!bridge.on_application_cold_start());
    }
}
