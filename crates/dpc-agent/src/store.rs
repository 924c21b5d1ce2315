//! SQLite-backed persisted flag store.
//!
//! Backs the boot replay and relock policy flags with a single small table.
//! The store must survive process death and reboot, and `take_bool_and_clear`
//! must be atomic: two cold starts racing to consume the replay flag are
//! serialized by an exclusive transaction, so at most one observes `true`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use dpc_core::clock::{Clock, SystemClock};
use dpc_core::flags::{FlagStore, FlagStoreError};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

/// Durable flag store over a SQLite database file.
pub struct SqliteFlagStore {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
}

impl SqliteFlagStore {
    /// Opens (or creates) the store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`FlagStoreError`] when the database cannot be opened or the
    /// schema cannot be initialized.
    pub fn open(path: &Path) -> Result<Self, FlagStoreError> {
        let conn = Connection::open(path).map_err(sql_err)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store; useful for tests.
    ///
    /// # Errors
    ///
    /// Returns [`FlagStoreError`] when the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, FlagStoreError> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Self::from_connection(conn)
    }

    /// Replaces the clock used for update timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn from_connection(conn: Connection) -> Result<Self, FlagStoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_flags ( \
                 flag_key TEXT PRIMARY KEY, \
                 flag_value INTEGER NOT NULL, \
                 updated_at_secs INTEGER NOT NULL \
             )",
            [],
        )
        .map_err(sql_err)?;
        debug!("flag store schema ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(SystemClock),
        })
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn sql_err(err: rusqlite::Error) -> FlagStoreError {
    FlagStoreError::backend(err.to_string())
}

impl FlagStore for SqliteFlagStore {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, FlagStoreError> {
        let conn = self.lock_conn();
        let value: Option<i64> = conn
            .query_row(
                "SELECT flag_value FROM agent_flags WHERE flag_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;
        Ok(value.map_or(default, |v| v != 0))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), FlagStoreError> {
        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO agent_flags (flag_key, flag_value, updated_at_secs) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT(flag_key) DO UPDATE SET \
                 flag_value = excluded.flag_value, \
                 updated_at_secs = excluded.updated_at_secs",
            params![key, i64::from(value), self.clock.now_secs() as i64],
        )
        .map_err(sql_err)?;
        Ok(())
    }

    fn take_bool_and_clear(&self, key: &str) -> Result<bool, FlagStoreError> {
        let mut conn = self.lock_conn();
        // Immediate transaction: concurrent takers serialize here, and the
        // loser observes the row already gone.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sql_err)?;
        let value: Option<i64> = tx
            .query_row(
                "SELECT flag_value FROM agent_flags WHERE flag_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;
        tx.execute("DELETE FROM agent_flags WHERE flag_key = ?1", params![key])
            .map_err(sql_err)?;
        tx.commit().map_err(sql_err)?;
        Ok(value.is_some_and(|v| v != 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpc_core::clock::FixedClock;
    use dpc_core::flags::KEY_BOOT_REPLAY_PENDING;

    #[test]
    fn test_get_returns_default_when_absent() {
        let store = SqliteFlagStore::open_in_memory().unwrap();
        assert!(!store.get_bool("missing", false).unwrap());
        assert!(store.get_bool("missing", true).unwrap());
    }

    #[test]
    fn test_set_then_get_roundtrips() {
        let store = SqliteFlagStore::open_in_memory().unwrap();
        store.set_bool("relock", true).unwrap();
        assert!(store.get_bool("relock", false).unwrap());
        store.set_bool("relock", false).unwrap();
        assert!(!store.get_bool("relock", true).unwrap());
    }

    #[test]
    fn test_take_clears_exactly_once() {
        let store = SqliteFlagStore::open_in_memory().unwrap()
            .with_clock(Arc::new(FixedClock::new(1_700_000_000)));
        store.set_bool(KEY_BOOT_REPLAY_PENDING, true).unwrap();
        assert!(store.take_bool_and_clear(KEY_BOOT_REPLAY_PENDING).unwrap());
        assert!(!store.take_bool_and_clear(KEY_BOOT_REPLAY_PENDING).unwrap());
    }

    #[test]
    fn test_flags_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.db");
        {
            let store = SqliteFlagStore::open(&path).unwrap();
            store.set_bool("relock", true).unwrap();
        }
        let store = SqliteFlagStore::open(&path).unwrap();
        assert!(store.get_bool("relock", false).unwrap());
    }

    #[test]
    fn test_concurrent_takers_see_one_true() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.db");
        let store = Arc::new(SqliteFlagStore::open(&path).unwrap());
        store.set_bool(KEY_BOOT_REPLAY_PENDING, true).unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.take_bool_and_clear(KEY_BOOT_REPLAY_PENDING).unwrap()
            }));
        }
        let winners: usize = handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum();
        assert_eq!(winners, 1);
    }
}
