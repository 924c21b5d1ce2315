//! Provisioning-completion handling.
//!
//! When the platform finishes provisioning this application, the agent
//! records a durable marker and brings the application surface forward so
//! setup can continue in the foreground.

use std::sync::Arc;

use dpc_core::events::{AgentEvent, EventSink};
use dpc_core::flags::{FlagStore, KEY_PROVISIONED};
use dpc_core::platform::LauncherControl;
use tracing::{info, warn};

/// Reacts to the platform's provisioning-complete signal.
pub struct ProvisioningHandler {
    store: Arc<dyn FlagStore>,
    launcher: Arc<dyn LauncherControl>,
    sink: Arc<dyn EventSink>,
}

impl ProvisioningHandler {
    /// Creates a handler over the given store and launcher control.
    #[must_use]
    pub fn new(
        store: Arc<dyn FlagStore>,
        launcher: Arc<dyn LauncherControl>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            launcher,
            sink,
        }
    }

    /// Records the provisioned marker and surfaces the application.
    pub fn on_provisioning_complete(&self) {
        info!("platform provisioning completed");
        if let Err(err) = self.store.set_bool(KEY_PROVISIONED, true) {
            warn!(error = %err, "failed to persist provisioned marker");
        }
        if let Err(err) = self.launcher.open_application() {
            warn!(error = %err, "could not bring application surface forward");
        }
        self.sink.emit(AgentEvent::ProvisioningCompleted);
    }

    /// Whether provisioning has completed on this device.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        self.store
            .get_bool(KEY_PROVISIONED, false)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpc_core::flags::InMemoryFlagStore;
    use dpc_core::testing::{MockLauncher, RecordingSink};

    #[test]
    fn test_provisioning_sets_marker_and_opens_app() {
        let store = Arc::new(InMemoryFlagStore::new());
        let launcher = Arc::new(MockLauncher::new());
        let sink = Arc::new(RecordingSink::new());
        let handler = ProvisioningHandler::new(store, launcher.clone(), sink.clone());

        assert!(!handler.is_provisioned());
        handler.on_provisioning_complete();

        assert!(handler.is_provisioned());
        assert_eq!(launcher.calls_named("open_application"), 1);
        assert_eq!(sink.events(), vec![AgentEvent::ProvisioningCompleted]);
    }
}
