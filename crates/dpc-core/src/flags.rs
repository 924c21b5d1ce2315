//! Persisted flag store trait and well-known keys.
//!
//! The boot signal handler and the application surface never share a call
//! stack; durable flags are the only guaranteed communication channel between
//! them. The store must survive process death and device reboot.
//!
//! # Atomicity
//!
//! [`FlagStore::take_bool_and_clear`] must read and clear a flag in one
//! atomic step. Two near-simultaneous cold starts racing to consume the
//! replay flag are serialized by the store; the loser observes the flag
//! already cleared and performs no replay.

use std::collections::HashMap;
use std::sync::Mutex;

/// One-shot replay flag: a boot signal arrived before any surface existed.
///
/// Set by the boot signal path, cleared exactly once by the first subsequent
/// coordinator initialization.
pub const KEY_BOOT_REPLAY_PENDING: &str = "boot_replay_pending";

/// Durable policy flag: this device should re-enter the locked state after a
/// boot. Set on a successful privileged lock, cleared by unlock and by
/// disabling the launcher preference.
pub const KEY_RELOCK_AT_BOOT: &str = "relock_at_boot";

/// Durable marker: platform provisioning for this application completed.
pub const KEY_PROVISIONED: &str = "provisioned";

/// Errors surfaced by a flag store backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FlagStoreError {
    /// The backing storage failed.
    #[error("flag store backend failure: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },
}

impl FlagStoreError {
    /// Convenience constructor for backend failures.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Durable boolean key-value storage surviving process death and reboot.
pub trait FlagStore: Send + Sync {
    /// Reads a flag, returning `default` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`FlagStoreError`] when the backing storage fails.
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, FlagStoreError>;

    /// Writes a flag durably.
    ///
    /// # Errors
    ///
    /// Returns [`FlagStoreError`] when the backing storage fails.
    fn set_bool(&self, key: &str, value: bool) -> Result<(), FlagStoreError>;

    /// Atomically reads a flag and clears it in the same step.
    ///
    /// Returns the value observed before the clear (`false` when absent).
    /// Concurrent callers must be serialized by the store so at most one
    /// observes `true`.
    ///
    /// # Errors
    ///
    /// Returns [`FlagStoreError`] when the backing storage fails.
    fn take_bool_and_clear(&self, key: &str) -> Result<bool, FlagStoreError>;
}

/// In-memory flag store.
///
/// Does not survive process death; suitable for tests and for hosts that
/// supply durability elsewhere.
#[derive(Debug, Default)]
pub struct InMemoryFlagStore {
    inner: Mutex<HashMap<String, bool>>,
}

impl InMemoryFlagStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for InMemoryFlagStore {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, FlagStoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| FlagStoreError::backend("flag map poisoned"))?;
        Ok(inner.get(key).copied().unwrap_or(default))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), FlagStoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| FlagStoreError::backend("flag map poisoned"))?;
        inner.insert(key.to_string(), value);
        Ok(())
    }

    fn take_bool_and_clear(&self, key: &str) -> Result<bool, FlagStoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| FlagStoreError::backend("flag map poisoned"))?;
        Ok(inner.remove(key).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_default_when_absent() {
        let store = InMemoryFlagStore::new();
        assert!(!store.get_bool(KEY_RELOCK_AT_BOOT, false).unwrap());
        assert!(store.get_bool(KEY_RELOCK_AT_BOOT, true).unwrap());
    }

    #[test]
    fn test_set_then_get_roundtrips() {
        let store = InMemoryFlagStore::new();
        store.set_bool(KEY_RELOCK_AT_BOOT, true).unwrap();
        assert!(store.get_bool(KEY_RELOCK_AT_BOOT, false).unwrap());
    }

    #[test]
    fn test_take_clears_exactly_once() {
        let store = InMemoryFlagStore::new();
        store.set_bool(KEY_BOOT_REPLAY_PENDING, true).unwrap();
        assert!(store.take_bool_and_clear(KEY_BOOT_REPLAY_PENDING).unwrap());
        assert!(!store.take_bool_and_clear(KEY_BOOT_REPLAY_PENDING).unwrap());
        assert!(!store.get_bool(KEY_BOOT_REPLAY_PENDING, false).unwrap());
    }
}
