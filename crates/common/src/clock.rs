//! Clock and timing utilities for the playback loop.
//!
//! The scheduler never reads the system clock directly. It asks a
//! [`TimeSource`] for "now", which lets the live player run on a monotonic
//! clock while tests and offline export inject a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Something that can report the current time in seconds.
///
/// Values only need to be monotonic relative to each other; the epoch is
/// implementation-defined.
pub trait TimeSource: Send + Sync {
    fn now_secs(&self) -> f64;
}

/// A monotonic clock anchored to the moment it was started.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// The instant the clock started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl MonotonicClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the clock started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

impl TimeSource for MonotonicClock {
    fn now_secs(&self) -> f64 {
        self.elapsed_secs()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_secs: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start_secs.to_bits())),
        }
    }

    pub fn set(&self, secs: f64) {
        self.bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        let now = self.now_secs();
        self.set(now + secs);
    }
}

impl TimeSource for ManualClock {
    fn now_secs(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Drift measurement between the logical clock and a media source.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Where the source should be (seconds).
    pub expected_secs: f64,
    /// Where the source reports it is (seconds).
    pub measured_secs: f64,
}

impl DriftMeasurement {
    /// Drift in seconds (positive = measured is ahead).
    pub fn drift_secs(&self) -> f64 {
        self.measured_secs - self.expected_secs
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_secs() * 1000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds(&self, tolerance_secs: f64) -> bool {
        self.drift_secs().abs() > tolerance_secs
    }
}

/// Fixed-cadence tick controller for the scheduler loop.
#[derive(Debug)]
pub struct FrameTicker {
    interval_secs: f64,
    last_tick_secs: Option<f64>,
}

impl FrameTicker {
    /// Create a ticker targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            interval_secs: 1.0 / target_hz.max(1) as f64,
            last_tick_secs: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, now_secs: f64) -> bool {
        match self.last_tick_secs {
            None => {
                self.last_tick_secs = Some(now_secs);
                true
            }
            Some(last) if now_secs >= last + self.interval_secs => {
                self.last_tick_secs = Some(now_secs);
                true
            }
            _ => false,
        }
    }

    /// Target interval in seconds.
    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }
}

/// Format seconds as `mm:ss:cc` (centiseconds), the player's time readout.
pub fn format_timecode(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let centis = ((seconds % 1.0) * 100.0).floor() as u64;
    format!("{mins:02}:{secs:02}:{centis:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_elapsed() {
        let clock = MonotonicClock::start();
        assert!(clock.now_secs() < 1.0);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1.0);
        let other = clock.clone();
        clock.advance(0.5);
        assert!((other.now_secs() - 1.5).abs() < 1e-12);
        other.set(10.0);
        assert!((clock.now_secs() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_drift_measurement() {
        let drift = DriftMeasurement {
            expected_secs: 4.0,
            measured_secs: 4.35,
        };
        assert!((drift.drift_secs() - 0.35).abs() < 1e-9);
        assert!((drift.drift_ms() - 350.0).abs() < 1e-6);
        assert!(drift.exceeds(0.3));
        assert!(!drift.exceeds(0.5));
    }

    #[test]
    fn test_frame_ticker() {
        let mut ticker = FrameTicker::new(60);
        assert!(ticker.should_tick(0.0));
        assert!(!ticker.should_tick(0.001));
        assert!(ticker.should_tick(0.017));
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "00:00:00");
        assert_eq!(format_timecode(83.456), "01:23:45");
        assert_eq!(format_timecode(-2.0), "00:00:00");
    }
}
