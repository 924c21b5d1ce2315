//! End-to-end boot persistence and relock scenarios.
//!
//! Exercises the full cycle across simulated process lifetimes sharing one
//! SQLite store: a privileged lock records the relock policy, a boot signal
//! records the replay event, and the next cold start replays it exactly
//! once.

mod common;

use std::sync::Arc;

use common::{host, TEST_PACKAGE};
use dpc_agent::store::SqliteFlagStore;
use dpc_core::admin::AdminPrivilegeCoordinator;
use dpc_core::boot::BootPersistenceBridge;
use dpc_core::config::AgentConfig;
use dpc_core::events::AgentEvent;
use dpc_core::flags::{FlagStore, KEY_RELOCK_AT_BOOT};
use dpc_core::lock::{LauncherPreference, LockState};
use dpc_core::testing::{MockPrivilegeBackend, MockSurface, RecordingSink};

fn open_store(path: &std::path::Path) -> Arc<SqliteFlagStore> {
    Arc::new(SqliteFlagStore::open(path).expect("open flag store"))
}

#[test]
fn test_boot_signal_relocks_on_next_cold_start() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("flags.db");

    // Process 1: the device is set up as a kiosk. The privileged lock
    // persists the relock-at-boot policy.
    {
        let h = host(
            open_store(&db),
            MockPrivilegeBackend::owner_active(),
            MockSurface::attached(),
        );
        h.agent.initialize();
        h.agent.lock_machine().lock(true).unwrap();
        assert!(h.agent.lock_machine().is_locked());
    }
    assert!(open_store(&db).get_bool(KEY_RELOCK_AT_BOOT, false).unwrap());

    // Boot: a short-lived system context with no application surface. Only
    // the durable store is shared with the application.
    {
        let config = AgentConfig::for_package(TEST_PACKAGE);
        let bridge = BootPersistenceBridge::new(open_store(&db), &config);
        assert!(bridge.on_boot_signal("boot_completed"));
    }

    // Process 2: the application cold-starts before any surface attaches.
    let h = host(
        open_store(&db),
        MockPrivilegeBackend::owner_active(),
        MockSurface::detached(),
    );
    h.agent.initialize();

    // The replay fired, the relock policy held, and the lock deferred until
    // the surface is ready.
    assert_eq!(h.sink.events(), vec![AgentEvent::BootResumeRequested]);
    assert_eq!(h.agent.lock_machine().state(), LockState::Locking);
    assert!(!h.agent.lock_machine().is_locked());

    h.surface.fire_ready();
    assert_eq!(h.agent.lock_machine().state(), LockState::Locked);
    assert_eq!(
        h.agent.lock_machine().launcher_preference(),
        LauncherPreference::ThisAppPreferred
    );

    // A further restart without a boot signal replays nothing.
    let h2 = host(
        open_store(&db),
        MockPrivilegeBackend::owner_active(),
        MockSurface::detached(),
    );
    h2.agent.initialize();
    assert!(h2.sink.events().is_empty());
}

#[test]
fn test_boot_without_relock_policy_emits_event_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("flags.db");

    {
        let config = AgentConfig::for_package(TEST_PACKAGE);
        let bridge = BootPersistenceBridge::new(open_store(&db), &config);
        bridge.on_boot_signal("boot_completed");
    }

    let h = host(
        open_store(&db),
        MockPrivilegeBackend::owner_active(),
        MockSurface::detached(),
    );
    h.agent.initialize();

    // The event still reaches the host, but no lock attempt starts.
    assert_eq!(h.sink.events(), vec![AgentEvent::BootResumeRequested]);
    assert_eq!(h.agent.lock_machine().state(), LockState::Unlocked);
}

#[test]
fn test_unlock_cancels_relock_policy_across_boots() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("flags.db");

    {
        let h = host(
            open_store(&db),
            MockPrivilegeBackend::owner_active(),
            MockSurface::attached(),
        );
        h.agent.lock_machine().lock(true).unwrap();
        h.agent.lock_machine().unlock();
    }

    {
        let config = AgentConfig::for_package(TEST_PACKAGE);
        BootPersistenceBridge::new(open_store(&db), &config).on_boot_signal("boot_completed");
    }

    let h = host(
        open_store(&db),
        MockPrivilegeBackend::owner_active(),
        MockSurface::detached(),
    );
    h.agent.initialize();
    assert_eq!(h.sink.events(), vec![AgentEvent::BootResumeRequested]);
    assert_eq!(h.agent.lock_machine().state(), LockState::Unlocked);
}

#[test]
fn test_concurrent_cold_starts_replay_at_most_once() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("flags.db");
    let store = open_store(&db);
    let config = AgentConfig::for_package(TEST_PACKAGE);

    BootPersistenceBridge::new(store.clone(), &config).on_boot_signal("boot_completed");

    // Two coordinators racing to cold-start over the same durable store.
    let mut handles = Vec::new();
    let mut sinks = Vec::new();
    for _ in 0..2 {
        let backend = Arc::new(MockPrivilegeBackend::owner_active());
        let sink = Arc::new(RecordingSink::new());
        let boot = Arc::new(BootPersistenceBridge::new(store.clone(), &config));
        let coordinator = Arc::new(AdminPrivilegeCoordinator::new(
            backend,
            boot,
            sink.clone(),
            &config,
        ));
        sinks.push(sink);
        handles.push(std::thread::spawn(move || coordinator.initialize()));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let replays: usize = sinks
        .iter()
        .map(|sink| {
            sink.events()
                .iter()
                .filter(|e| **e == AgentEvent::BootResumeRequested)
                .count()
        })
        .sum();
    assert_eq!(replays, 1, "replay must fire exactly once across racers");
}
