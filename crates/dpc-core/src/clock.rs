//! Clock abstraction for time-dependent bookkeeping.
//!
//! Time-dependent code takes an injected clock rather than reading system
//! time directly, so stores and reports can be tested deterministically.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Trait for clock implementations.
pub trait Clock: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now_secs(&self) -> u64;
}

/// System clock that uses the real system time.
///
/// This is the default clock for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}

/// Fixed clock for testing that returns a constant timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    /// The fixed timestamp to return.
    pub timestamp: u64,
}

impl FixedClock {
    /// Creates a new fixed clock with the given timestamp.
    #[must_use]
    pub const fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> u64 {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_is_constant() {
        let clock = FixedClock::new(1_700_000_000);
        assert_eq!(clock.now_secs(), 1_700_000_000);
        assert_eq!(clock.now_secs(), clock.now_secs());
    }
}
