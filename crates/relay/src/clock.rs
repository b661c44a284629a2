//! The monotonic time source pacing is measured against.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A monotonic microsecond clock that can also put the calling thread to
/// sleep.
pub trait Clock: Send + Sync {
    /// Microseconds since an arbitrary epoch. Never goes backwards within one
    /// run.
    fn now_micros(&self) -> i64;

    /// Block the calling thread for `micros` microseconds. Non-positive values
    /// return immediately.
    fn sleep_micros(&self, micros: i64);
}

/// The real clock, counting from when it was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_micros(&self) -> i64 {
        self.epoch.elapsed().as_micros().min(i64::MAX as u128) as i64
    }

    fn sleep_micros(&self, micros: i64) {
        if micros > 0 {
            thread::sleep(Duration::from_micros(micros as u64));
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_micros(&self) -> i64 {
        (**self).now_micros()
    }

    fn sleep_micros(&self, micros: i64) {
        (**self).sleep_micros(micros)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_micros(&self) -> i64 {
        (**self).now_micros()
    }

    fn sleep_micros(&self, micros: i64) {
        (**self).sleep_micros(micros)
    }
}
