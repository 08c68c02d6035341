//! Time Management
//!
//! Clock sources shared by the cache store and the performance monitor:
//! - Wall-clock milliseconds for persisted timestamps and freshness checks
//! - Monotonic milliseconds for frame sampling
//! - A manually driven clock for deterministic tests and replays

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of time for the runtime
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Wall-clock milliseconds since the Unix epoch
    fn epoch_millis(&self) -> u64;

    /// Monotonic milliseconds since an arbitrary, fixed origin
    fn monotonic_millis(&self) -> f64;
}

/// Clock backed by the operating system
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a new system clock whose monotonic origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }

    fn monotonic_millis(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually advanced clock.
///
/// Both time lines move together when [`ManualClock::advance`] is called.
/// The epoch can also be set directly to simulate records written in the past.
#[derive(Debug, Default)]
pub struct ManualClock {
    epoch_millis: AtomicU64,
    monotonic_micros: AtomicU64,
}

impl ManualClock {
    /// Create a manual clock starting at the given epoch time
    pub fn new(epoch_millis: u64) -> Self {
        Self {
            epoch_millis: AtomicU64::new(epoch_millis),
            monotonic_micros: AtomicU64::new(0),
        }
    }

    /// Advance both time lines
    pub fn advance(&self, delta: Duration) {
        self.epoch_millis
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
        self.monotonic_micros
            .fetch_add(delta.as_micros() as u64, Ordering::SeqCst);
    }

    /// Jump the wall clock to an absolute time (the monotonic line is untouched)
    pub fn set_epoch_millis(&self, epoch_millis: u64) {
        self.epoch_millis.store(epoch_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn epoch_millis(&self) -> u64 {
        self.epoch_millis.load(Ordering::SeqCst)
    }

    fn monotonic_millis(&self) -> f64 {
        self.monotonic_micros.load(Ordering::SeqCst) as f64 / 1000.0
    }
}

/// Milliseconds in one day
pub const DAY_MILLIS: u64 = 24 * 60 * 60 * 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock() {
        let clock = SystemClock::new();
        assert!(clock.epoch_millis() > 1_600_000_000_000);

        let a = clock.monotonic_millis();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.monotonic_millis() >= a + 5.0);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(1_000);
        clock.advance(Duration::from_millis(250));

        assert_eq!(clock.epoch_millis(), 1_250);
        assert!((clock.monotonic_millis() - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_manual_clock_set_epoch() {
        let clock = ManualClock::new(0);
        clock.set_epoch_millis(10 * DAY_MILLIS);
        assert_eq!(clock.epoch_millis(), 10 * DAY_MILLIS);
        assert_eq!(clock.monotonic_millis(), 0.0);
    }
}
