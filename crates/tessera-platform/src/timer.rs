//! Timers
//!
//! Timing utilities for telemetry: wall-clock timestamps, rolling frame-time
//! windows and scoped timers reported through tracing.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Wall-clock timestamp in milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Get the current timestamp
    pub fn now() -> Self {
        Self(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_millis() as u64,
        )
    }

    /// Create a timestamp from epoch milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Get timestamp as milliseconds since epoch
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Age of this timestamp relative to `now`, saturating at zero
    pub fn age_at(&self, now: Timestamp) -> Duration {
        Duration::from_millis(now.0.saturating_sub(self.0))
    }

    /// Format an age as a short human string (`42s`, `17m`, `5h`, `3d`)
    pub fn format_age(age: Duration) -> String {
        let secs = age.as_secs();
        match secs {
            0..60 => format!("{secs}s"),
            60..3_600 => format!("{}m", secs / 60),
            3_600..86_400 => format!("{}h", secs / 3_600),
            _ => format!("{}d", secs / 86_400),
        }
    }
}

/// Scoped timer that reports its duration on drop
///
/// Events go to the `timing` target. Without a tracing subscriber they are
/// forwarded to the `log` facade, so `env_logger` shows them at debug level.
pub struct ScopedTimer<'a> {
    name: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    /// Create a scoped timer that reports to tracing
    pub fn traced(name: &'a str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            target: "timing",
            name = self.name,
            duration_us = duration.as_micros() as u64,
            "Timer completed"
        );
    }
}

/// Rolling window of frame times (in milliseconds)
#[derive(Debug, Clone)]
pub struct RollingTimer {
    samples: Vec<f64>,
    index: usize,
    count: usize,
}

impl RollingTimer {
    /// Create a new rolling timer with the given sample count
    pub fn new(sample_count: usize) -> Self {
        Self {
            samples: vec![0.0; sample_count.max(1)],
            index: 0,
            count: 0,
        }
    }

    /// Record a new sample
    pub fn record(&mut self, sample: f64) {
        self.samples[self.index] = sample;
        self.index = (self.index + 1) % self.samples.len();
        self.count = (self.count + 1).min(self.samples.len());
    }

    /// Get the average sample value
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.samples.iter().take(self.count).sum::<f64>() / self.count as f64
    }

    /// Get the minimum sample value
    pub fn min(&self) -> f64 {
        self.samples
            .iter()
            .take(self.count)
            .copied()
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Get the maximum sample value
    pub fn max(&self) -> f64 {
        self.samples
            .iter()
            .take(self.count)
            .copied()
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    /// Get the sample count
    pub fn count(&self) -> usize {
        self.count
    }

    /// Reset all samples
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
        self.index = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_timestamp_age() {
        let written = Timestamp::from_millis(1_000);
        let now = Timestamp::from_millis(61_000);
        assert_eq!(written.age_at(now), Duration::from_secs(60));
        assert_eq!(now.age_at(written), Duration::ZERO);
    }

    #[test]
    fn test_format_age() {
        assert_eq!(Timestamp::format_age(Duration::from_secs(42)), "42s");
        assert_eq!(Timestamp::format_age(Duration::from_secs(17 * 60)), "17m");
        assert_eq!(Timestamp::format_age(Duration::from_secs(5 * 3_600)), "5h");
        assert_eq!(Timestamp::format_age(Duration::from_secs(3 * 86_400)), "3d");
    }

    #[test]
    fn test_rolling_timer() {
        let mut timer = RollingTimer::new(5);

        timer.record(16.0);
        timer.record(17.0);
        timer.record(15.0);

        assert_eq!(timer.count(), 3);
        assert!((timer.average() - 16.0).abs() < 1e-9);
        assert_eq!(timer.min(), 15.0);
        assert_eq!(timer.max(), 17.0);
    }

    #[test]
    fn test_rolling_timer_wraps() {
        let mut timer = RollingTimer::new(2);
        timer.record(10.0);
        timer.record(20.0);
        timer.record(30.0);

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.min(), 20.0);
        assert_eq!(timer.max(), 30.0);

        timer.reset();
        assert_eq!(timer.count(), 0);
        assert_eq!(timer.average(), 0.0);
    }

    struct CaptureLogger {
        records: Mutex<Vec<String>>,
    }

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if record.target() == "timing" {
                if let Ok(mut records) = self.records.lock() {
                    records.push(format!("{} {}", record.level(), record.args()));
                }
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger {
        records: Mutex::new(Vec::new()),
    };

    #[test]
    fn test_scoped_timer_reaches_log() {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Debug);

        {
            let _timer = ScopedTimer::traced("cache.sweep");
            std::thread::sleep(Duration::from_millis(2));
        }

        let records = LOGGER.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].starts_with("DEBUG Timer completed"));
        assert!(records[0].contains("cache.sweep"));
    }
}
