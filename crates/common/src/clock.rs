//! Clock and timing utilities for recording progress.
//!
//! Progress is measured against a monotonic epoch captured when a
//! recording starts. The time source is injectable so the duration
//! limit can be exercised without sleeping.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

/// The process monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Epoch of a single recording.
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant recording started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339).
    epoch_wall: String,
}

impl RecordingClock {
    /// Anchor a recording clock at `epoch`.
    pub fn start_at(epoch: Instant) -> Self {
        Self {
            epoch,
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Time since the epoch as seen at `now`; zero if `now` precedes it.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.epoch)
    }

    /// Fraction of `limit` elapsed at `now`, clamped to `[0.0, 1.0]`.
    pub fn fraction_at(&self, now: Instant, limit: Duration) -> f64 {
        if limit.is_zero() {
            return 1.0;
        }
        (self.elapsed_at(now).as_secs_f64() / limit.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Wall-clock time at recording start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}
