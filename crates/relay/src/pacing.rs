//! Decides when a frame should be shown, based on its presentation timestamp
//! and the wall clock.
//!
//! The policy keeps a running target time (`scheduled_wall_clock`) that
//! advances by the pts difference between consecutive frames. A frame ahead of
//! its target is held back by sleeping the producer. A frame more than
//! [LATE_DROP_MICROS] behind its target is dropped. A pts jump backwards, or
//! forwards by [DISCONTINUITY_MICROS] or more, is treated as a discontinuity
//! and doesn't move the target at all.

use crate::clock::Clock;
use crate::time::{MICROSECONDS, Timestamp, rescale};

/// Pts gaps of this size or larger (in microseconds) are discontinuities, not
/// waits.
pub const DISCONTINUITY_MICROS: i64 = 5_000_000;

/// Frames later than this (in microseconds) behind schedule are dropped.
pub const LATE_DROP_MICROS: i64 = 5_000;

/// What to do with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Publish the frame (any pacing delay has already happened).
    Display,
    /// The frame is too late to be worth sending.
    Drop,
}

/// Whether frames are paced against their timestamps at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PacingMode {
    /// Sleep until frames are due and drop the ones that are too late.
    #[default]
    Paced,
    /// Show every frame as soon as it's decoded. This is the plain callback
    /// loop: every decision is [Decision::Display] and nothing sleeps.
    Unpaced,
}

/// Per-stream pacing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacingState {
    /// The timestamp of the previous timestamped frame, shown or not, in the
    /// stream's own ticks.
    pub last_pts: Option<Timestamp>,
    /// When (on the [Clock]) the previous timestamped frame was due.
    pub scheduled_wall_clock: Option<i64>,
}

/// Running totals, for the end-of-session summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacingStats {
    pub displayed: u64,
    pub dropped: u64,
    pub discontinuities: u64,
    pub slept_micros: i64,
}

/// See the [module docs](self).
#[derive(Debug)]
pub struct PacingPolicy<C> {
    clock: C,
    mode: PacingMode,
    state: PacingState,
    stats: PacingStats,
}

impl<C: Clock> PacingPolicy<C> {
    pub fn new(clock: C, mode: PacingMode) -> Self {
        Self {
            clock,
            mode,
            state: PacingState::default(),
            stats: PacingStats::default(),
        }
    }

    /// Decide what to do with a frame stamped `pts`. May sleep the calling
    /// thread if the frame is early.
    pub fn evaluate(&mut self, pts: Option<Timestamp>) -> Decision {
        let decision = match self.mode {
            PacingMode::Unpaced => Decision::Display,
            PacingMode::Paced => self.evaluate_paced(pts),
        };

        match decision {
            Decision::Display => self.stats.displayed += 1,
            Decision::Drop => self.stats.dropped += 1,
        }

        decision
    }

    fn evaluate_paced(&mut self, pts: Option<Timestamp>) -> Decision {
        // No timing info means nothing to pace against.
        let Some(pts) = pts else {
            return Decision::Display;
        };
        let (Some(last_pts), Some(scheduled)) =
            (self.state.last_pts, self.state.scheduled_wall_clock)
        else {
            // The first timestamped frame anchors the schedule to "now".
            self.state = PacingState {
                last_pts: Some(pts),
                scheduled_wall_clock: Some(self.clock.now_micros()),
            };
            return Decision::Display;
        };

        // Always follow the source's timeline, even through drops and
        // discontinuities, so the next delta is measured from this frame.
        self.state.last_pts = Some(pts);

        let delta = pts_delta_micros(last_pts, pts);
        if delta <= 0 || delta >= DISCONTINUITY_MICROS {
            self.stats.discontinuities += 1;
            util::debug_log_warning!(
                "Timestamp discontinuity of {delta}us, showing the frame unpaced."
            );
            return Decision::Display;
        }

        let scheduled = scheduled + delta;
        self.state.scheduled_wall_clock = Some(scheduled);

        let now = self.clock.now_micros();
        if scheduled > now {
            let wait = scheduled - now;
            self.clock.sleep_micros(wait);
            self.stats.slept_micros += wait;
            Decision::Display
        } else if scheduled + LATE_DROP_MICROS < now {
            Decision::Drop
        } else {
            Decision::Display
        }
    }

    pub fn state(&self) -> PacingState {
        self.state
    }

    pub fn stats(&self) -> PacingStats {
        self.stats
    }

    /// Forget the schedule. The next timestamped frame anchors a new one.
    pub fn reset(&mut self) {
        self.state = PacingState::default();
    }
}

/// `current - last` in microseconds. The difference is taken in stream ticks
/// and rescaled once, so rounding never accumulates across frames.
fn pts_delta_micros(last: Timestamp, current: Timestamp) -> i64 {
    if last.time_base == current.time_base {
        rescale(
            current.value.saturating_sub(last.value),
            current.time_base,
            MICROSECONDS,
        )
    } else {
        current.as_micros().saturating_sub(last.as_micros())
    }
}
