//! Agent composition root.
//!
//! Wires the coordination core to a host's platform implementations and
//! owns the boot-resume policy: when the coordinator replays a boot signal
//! and the relock-at-boot flag is set, the lock state machine re-enters
//! kiosk mode before the event is forwarded outward.

use std::sync::Arc;

use dpc_core::admin::AdminPrivilegeCoordinator;
use dpc_core::boot::BootPersistenceBridge;
use dpc_core::config::{AgentConfig, ConfigError};
use dpc_core::events::{AgentEvent, EventSink};
use dpc_core::flags::{FlagStore, KEY_RELOCK_AT_BOOT};
use dpc_core::lock::KioskLockStateMachine;
use dpc_core::platform::{
    CommandChannel, ForegroundSurface, LauncherControl, PrivilegeBackend,
};
use tracing::{debug, info, warn};

use crate::bridge::CommandBridge;
use crate::policy::{PolicyBackend, PolicyPassthrough};
use crate::provision::ProvisioningHandler;

/// Sink that re-enters kiosk mode on boot resume before forwarding events.
struct RelockOnBootSink {
    store: Arc<dyn FlagStore>,
    lock: Arc<KioskLockStateMachine>,
    outer: Arc<dyn EventSink>,
}

impl EventSink for RelockOnBootSink {
    fn emit(&self, event: AgentEvent) {
        if event == AgentEvent::BootResumeRequested {
            match self.store.get_bool(KEY_RELOCK_AT_BOOT, false) {
                Ok(true) => {
                    info!("relock policy set, re-entering kiosk mode");
                    if let Err(err) = self.lock.lock(true) {
                        warn!(error = %err, "boot relock attempt failed");
                    }
                }
                Ok(false) => debug!("boot resumed without relock policy"),
                Err(err) => warn!(error = %err, "failed to read relock policy flag"),
            }
        }
        self.outer.emit(event);
    }
}

/// Fully wired device-policy agent.
pub struct DevicePolicyAgent {
    admin: Arc<AdminPrivilegeCoordinator>,
    lock: Arc<KioskLockStateMachine>,
    boot: Arc<BootPersistenceBridge>,
    provisioning: ProvisioningHandler,
    bridge: CommandBridge,
}

impl DevicePolicyAgent {
    /// Wires the agent over the host's platform implementations.
    ///
    /// `sink` receives outbound events after the agent's own boot-resume
    /// wiring has run. `channel`, when given, is the best-effort boot fast
    /// path into a live application environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration fails validation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AgentConfig,
        store: Arc<dyn FlagStore>,
        backend: Arc<dyn PrivilegeBackend>,
        surface: Arc<dyn ForegroundSurface>,
        launcher: Arc<dyn LauncherControl>,
        policy: Arc<dyn PolicyBackend>,
        channel: Option<Arc<dyn CommandChannel>>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let lock = Arc::new(KioskLockStateMachine::new(
            Arc::clone(&backend),
            Arc::clone(&surface),
            Arc::clone(&launcher),
            Arc::clone(&store),
            config.package.clone(),
        ));
        let wired_sink: Arc<dyn EventSink> = Arc::new(RelockOnBootSink {
            store: Arc::clone(&store),
            lock: Arc::clone(&lock),
            outer: sink,
        });

        let mut boot = BootPersistenceBridge::new(Arc::clone(&store), config);
        if let Some(channel) = channel {
            boot = boot.with_channel(channel);
        }
        let boot = Arc::new(boot);

        let admin = Arc::new(AdminPrivilegeCoordinator::new(
            Arc::clone(&backend),
            Arc::clone(&boot),
            Arc::clone(&wired_sink),
            config,
        ));
        let passthrough = Arc::new(PolicyPassthrough::new(
            policy,
            Arc::clone(&surface),
            backend.capability_tier(),
            config.package.clone(),
        ));
        let provisioning =
            ProvisioningHandler::new(Arc::clone(&store), launcher, wired_sink);
        let bridge = CommandBridge::new(Arc::clone(&admin), Arc::clone(&lock), passthrough);

        Ok(Self {
            admin,
            lock,
            boot,
            provisioning,
            bridge,
        })
    }

    /// The inbound command bridge.
    #[must_use]
    pub const fn bridge(&self) -> &CommandBridge {
        &self.bridge
    }

    /// The lock state machine, for direct host queries.
    #[must_use]
    pub const fn lock_machine(&self) -> &Arc<KioskLockStateMachine> {
        &self.lock
    }

    /// The privilege coordinator.
    #[must_use]
    pub const fn admin(&self) -> &Arc<AdminPrivilegeCoordinator> {
        &self.admin
    }

    /// Initializes the coordinator; replays a pending boot signal at most
    /// once. Idempotent, so hosts may call it from every attach point.
    pub fn initialize(&self) {
        self.admin.initialize();
    }

    /// Handles an application surface becoming attached.
    pub fn on_surface_attached(&self) {
        self.admin.initialize();
        self.lock.on_surface_attached();
    }

    /// Handles a system boot broadcast. Safe to call from a short-lived
    /// system context with no surface alive.
    pub fn on_boot_signal(&self, action: &str) -> bool {
        self.boot.on_boot_signal(action)
    }

    /// Delivers a privilege-consent result from the platform boundary.
    pub fn on_privilege_result(&self, token: &str, granted: bool) {
        self.admin.on_privilege_result(token, granted);
    }

    /// Handles the platform's provisioning-complete signal.
    pub fn on_provisioning_complete(&self) {
        self.provisioning.on_provisioning_complete();
    }

    /// Whether provisioning has completed on this device.
    #[must_use]
    pub fn is_provisioned(&self) -> bool {
        self.provisioning.is_provisioned()
    }
}
