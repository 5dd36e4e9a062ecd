//! Clock abstraction for expiring sessions and cached search results.
//!
//! Admin session tokens carry a unix expiry and search results live for a
//! few seconds; both read time through [`Clock`] so tests can move time
//! forward without sleeping.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Utc};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Monotonic instant for TTL measurements.
    fn now(&self) -> Instant;

    /// Wall-clock time for timestamps and token expiry.
    fn now_system(&self) -> SystemTime;

    /// Whole seconds since the unix epoch.
    fn unix_seconds(&self) -> i64 {
        self.now_system()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    /// Wall-clock time as a UTC datetime.
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.now_system())
    }
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for tests.
///
/// Clones share the same time source, so a clone handed to a cache or an
/// app state moves together with the original.
#[derive(Debug, Clone)]
pub struct TestClock {
    /// Nanoseconds advanced since creation
    monotonic_ns: Arc<AtomicU64>,
    /// Wall-clock as nanoseconds since UNIX_EPOCH
    system_ns: Arc<AtomicU64>,
    base_instant: Instant,
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl TestClock {
    /// Creates a test clock starting at the current time.
    pub fn new() -> Self {
        Self::with_start_time(SystemTime::now())
    }

    /// Creates a test clock starting at `start`.
    pub fn with_start_time(start: SystemTime) -> Self {
        let since_epoch = start.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            monotonic_ns: Arc::new(AtomicU64::new(0)),
            system_ns: Arc::new(AtomicU64::new(saturating_nanos(since_epoch))),
            base_instant: Instant::now(),
        }
    }

    /// Advances both clocks by `duration`.
    pub fn advance(&self, duration: Duration) {
        let ns = saturating_nanos(duration);
        self.monotonic_ns.fetch_add(ns, Ordering::AcqRel);
        self.system_ns.fetch_add(ns, Ordering::AcqRel);
    }

    /// Moves the wall clock to `time`. Moving forward also advances the
    /// monotonic clock; moving backwards leaves it in place.
    pub fn jump_to(&self, time: SystemTime) {
        let target = saturating_nanos(time.duration_since(UNIX_EPOCH).unwrap_or_default());
        let current = self.system_ns.load(Ordering::Acquire);
        if target > current {
            self.advance(Duration::from_nanos(target - current));
        } else {
            self.system_ns.store(target, Ordering::Release);
        }
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.base_instant + Duration::from_nanos(self.monotonic_ns.load(Ordering::Acquire))
    }

    fn now_system(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.system_ns.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_both_clocks() {
        let start = UNIX_EPOCH + Duration::from_secs(1_000);
        let clock = TestClock::with_start_time(start);
        let instant = clock.now();

        clock.advance(Duration::from_secs(7));

        assert_eq!(clock.now().duration_since(instant), Duration::from_secs(7));
        assert_eq!(clock.unix_seconds(), 1_007);
    }

    #[test]
    fn jump_backwards_keeps_monotonic_time() {
        let clock = TestClock::with_start_time(UNIX_EPOCH + Duration::from_secs(5_000));
        let instant = clock.now();

        clock.jump_to(UNIX_EPOCH + Duration::from_secs(10));

        assert_eq!(clock.unix_seconds(), 10);
        assert_eq!(clock.now(), instant);
    }

    #[test]
    fn clones_share_time() {
        let clock = TestClock::with_start_time(UNIX_EPOCH);
        let shared = clock.clone();
        clock.advance(Duration::from_secs(60));
        assert_eq!(shared.unix_seconds(), 60);
        assert_eq!(shared.now_utc().timestamp(), 60);
    }
}
