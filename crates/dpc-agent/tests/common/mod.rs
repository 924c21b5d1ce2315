//! Shared harness for agent integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dpc_agent::policy::{DeviceInfo, PolicyBackend};
use dpc_agent::runtime::DevicePolicyAgent;
use dpc_core::config::AgentConfig;
use dpc_core::error::PolicyError;
use dpc_core::flags::FlagStore;
use dpc_core::testing::{CallLog, MockLauncher, MockPrivilegeBackend, MockSurface, RecordingSink};

pub const TEST_PACKAGE: &str = "com.example.kiosk";

/// Recording [`PolicyBackend`] double.
pub struct MockPolicyBackend {
    log: Arc<CallLog>,
    restrictions: Mutex<HashMap<String, HashMap<String, String>>>,
    installer_available: AtomicBool,
}

impl MockPolicyBackend {
    pub fn new() -> Self {
        Self {
            log: Arc::new(CallLog::new()),
            restrictions: Mutex::new(HashMap::new()),
            installer_available: AtomicBool::new(true),
        }
    }

    pub fn calls_named(&self, name: &str) -> usize {
        self.log.count_prefix(name)
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.entries()
    }

    pub fn set_installer_available(&self, available: bool) {
        self.installer_available.store(available, Ordering::SeqCst);
    }
}

impl PolicyBackend for MockPolicyBackend {
    fn set_application_restrictions(
        &self,
        package: &str,
        restrictions: &HashMap<String, String>,
    ) -> Result<(), PolicyError> {
        self.log
            .record(format!("set_application_restrictions[{package}]"));
        self.restrictions
            .lock()
            .unwrap()
            .insert(package.to_string(), restrictions.clone());
        Ok(())
    }

    fn get_application_restrictions(
        &self,
        package: &str,
    ) -> Result<HashMap<String, String>, PolicyError> {
        self.log
            .record(format!("get_application_restrictions[{package}]"));
        Ok(self
            .restrictions
            .lock()
            .unwrap()
            .get(package)
            .cloned()
            .unwrap_or_default())
    }

    fn add_user_restrictions(&self, restrictions: &[String]) -> Result<(), PolicyError> {
        self.log
            .record(format!("add_user_restrictions[{}]", restrictions.join(",")));
        Ok(())
    }

    fn clear_user_restrictions(&self, restrictions: &[String]) -> Result<(), PolicyError> {
        self.log.record(format!(
            "clear_user_restrictions[{}]",
            restrictions.join(",")
        ));
        Ok(())
    }

    fn lock_now(&self) -> Result<(), PolicyError> {
        self.log.record("lock_now");
        Ok(())
    }

    fn reset_credential_with_token(&self, _credential: &str) -> Result<bool, PolicyError> {
        self.log.record("reset_credential_with_token");
        Ok(true)
    }

    fn reboot(&self, reason: Option<&str>) -> Result<(), PolicyError> {
        self.log
            .record(format!("reboot[{}]", reason.unwrap_or("none")));
        Ok(())
    }

    fn wipe(&self, flags: u32, reason: Option<&str>) -> Result<(), PolicyError> {
        self.log
            .record(format!("wipe[{flags},{}]", reason.unwrap_or("none")));
        Ok(())
    }

    fn device_info(&self) -> Result<DeviceInfo, PolicyError> {
        self.log.record("device_info");
        Ok(DeviceInfo {
            model: "TC52".to_string(),
            manufacturer: "Example".to_string(),
            os_release: "11".to_string(),
            ..DeviceInfo::default()
        })
    }

    fn set_keyguard_disabled(&self, disabled: bool) -> Result<(), PolicyError> {
        self.log.record(format!("set_keyguard_disabled[{disabled}]"));
        Ok(())
    }

    fn set_camera_disabled(&self, disabled: bool) -> Result<(), PolicyError> {
        self.log.record(format!("set_camera_disabled[{disabled}]"));
        Ok(())
    }

    fn set_screen_capture_disabled(&self, disabled: bool) -> Result<(), PolicyError> {
        self.log
            .record(format!("set_screen_capture_disabled[{disabled}]"));
        Ok(())
    }

    fn request_package_install(&self, source: &str) -> Result<bool, PolicyError> {
        self.log.record(format!("request_package_install[{source}]"));
        Ok(self.installer_available.load(Ordering::SeqCst))
    }

    fn clear_device_owner(&self, package: &str) -> Result<(), PolicyError> {
        self.log.record(format!("clear_device_owner[{package}]"));
        Ok(())
    }
}

/// A fully wired agent over recording doubles.
pub struct TestHost {
    pub backend: Arc<MockPrivilegeBackend>,
    pub surface: Arc<MockSurface>,
    pub launcher: Arc<MockLauncher>,
    pub policy: Arc<MockPolicyBackend>,
    pub sink: Arc<RecordingSink>,
    pub agent: DevicePolicyAgent,
}

pub fn host(
    store: Arc<dyn FlagStore>,
    backend: MockPrivilegeBackend,
    surface: MockSurface,
) -> TestHost {
    let config = AgentConfig::for_package(TEST_PACKAGE);
    let backend = Arc::new(backend);
    let surface = Arc::new(surface);
    let launcher = Arc::new(MockLauncher::new());
    let policy = Arc::new(MockPolicyBackend::new());
    let sink = Arc::new(RecordingSink::new());
    let agent = DevicePolicyAgent::new(
        &config,
        store,
        backend.clone(),
        surface.clone(),
        launcher.clone(),
        policy.clone(),
        None,
        sink.clone(),
    )
    .expect("agent wiring");
    TestHost {
        backend,
        surface,
        launcher,
        policy,
        sink,
        agent,
    }
}
