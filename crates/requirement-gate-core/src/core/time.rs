// crates/requirement-gate-core/src/core/time.rs
// ============================================================================
// Module: Requirement Gate Time Model
// Description: Timestamps, TTL arithmetic, and injectable clocks.
// Purpose: Keep TTL expiry deterministic and testable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The engine never reads wall-clock time directly. Callers inject a [`Clock`]
//! and every TTL comparison goes through [`Timestamp::is_expired`], so expiry
//! is evaluated lazily at read time and tests can move time explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Unix epoch timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns milliseconds elapsed between `self` and `now` (negative if `now` is earlier).
    #[must_use]
    pub const fn elapsed_millis(self, now: Self) -> i64 {
        now.0.saturating_sub(self.0)
    }

    /// Returns true when `now - self > ttl_seconds`.
    ///
    /// A missing TTL never expires.
    #[must_use]
    pub fn is_expired(self, ttl_seconds: Option<u64>, now: Self) -> bool {
        let Some(ttl) = ttl_seconds else {
            return false;
        };
        let ttl_millis = i64::try_from(ttl).unwrap_or(i64::MAX / 1_000).saturating_mul(1_000);
        self.elapsed_millis(now) > ttl_millis
    }
}

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        Timestamp(millis)
    }
}

/// Manually advanced clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    /// Current time in unix milliseconds.
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at the given timestamp.
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.0),
        }
    }

    /// Advances the clock by whole seconds.
    pub fn advance_secs(&self, seconds: i64) {
        self.millis.fetch_add(seconds.saturating_mul(1_000), Ordering::SeqCst);
    }

    /// Sets the clock to an absolute timestamp.
    pub fn set(&self, now: Timestamp) {
        self.millis.store(now.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Clock;
    use super::ManualClock;
    use super::Timestamp;

    #[test]
    fn expiry_is_strictly_greater_than_ttl() {
        let start = Timestamp::from_unix_millis(10_000);
        assert!(!start.is_expired(Some(1), Timestamp::from_unix_millis(11_000)));
        assert!(start.is_expired(Some(1), Timestamp::from_unix_millis(11_001)));
    }

    #[test]
    fn missing_ttl_never_expires() {
        let start = Timestamp::from_unix_millis(0);
        assert!(!start.is_expired(None, Timestamp::from_unix_millis(i64::MAX)));
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Timestamp::from_unix_millis(5));
        clock.advance_secs(2);
        assert_eq!(clock.now(), Timestamp::from_unix_millis(2_005));
    }
}
