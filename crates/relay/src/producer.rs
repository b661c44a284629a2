//! Contains [ProducerLoop], the decode → filter → pace → publish side of a
//! session.

use crate::clock::Clock;
use crate::error::RelayError;
use crate::frame::Frame;
use crate::pacing::{Decision, PacingPolicy, PacingStats};
use crate::pipeline::{Decoder, Filter};
use crate::slot::{CloseOnDrop, FrameSlot};

/// Where a [ProducerLoop] is in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Phase {
    /// Reading input and decoding it.
    Decoding,
    /// Input is exhausted, collecting what the decoder held back.
    FlushingDecoder,
    /// The decoder is drained, collecting what the filter held back.
    FlushingFilter,
    Done,
}

/// Counters for one producer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProducerReport {
    /// Raw frames that came out of the decoder.
    pub decoded: u64,
    /// Display-ready frames that came out of the filter.
    pub filtered: u64,
    /// Frames handed to the slot.
    pub published: u64,
    /// Frames the pacing policy judged too late to send.
    pub dropped_late: u64,
    /// Published frames that were replaced before the consumer took them.
    pub overwritten: u64,
    pub pacing: PacingStats,
}

type StopCheck = Box<dyn Fn() -> bool + Send>;

/// Pulls frames out of a [Decoder], runs them through a [Filter], asks a
/// [PacingPolicy] about each one, and publishes the ones worth showing to a
/// [FrameSlot].
///
/// The slot is always closed when [Self::run] returns, whether the stream
/// ended, something failed, or the run was stopped.
pub struct ProducerLoop<D, F, C> {
    decoder: D,
    filter: F,
    policy: PacingPolicy<C>,
    phase: Phase,
    should_stop: StopCheck,
    report: ProducerReport,
}

impl<D, F, C> ProducerLoop<D, F, C>
where
    D: Decoder,
    F: Filter<Input = D::Frame>,
    C: Clock,
{
    pub fn new(decoder: D, filter: F, policy: PacingPolicy<C>) -> Self {
        Self {
            decoder,
            filter,
            policy,
            phase: Phase::Decoding,
            should_stop: Box::new(|| false),
            report: ProducerReport::default(),
        }
    }

    /// Checked between frames. Once it returns `true` the loop closes the slot
    /// and returns [RelayError::Cancelled].
    pub fn with_stop_check(mut self, should_stop: impl Fn() -> bool + Send + 'static) -> Self {
        self.should_stop = Box::new(should_stop);
        self
    }

    /// Run until the stream is fully drained, an error occurs, or the run is
    /// stopped (the slot was closed from the other side or the stop check
    /// fired).
    pub fn run(mut self, slot: &FrameSlot) -> Result<ProducerReport, RelayError> {
        let _close = CloseOnDrop::new(slot);

        while self.phase != Phase::Done {
            self.ensure_not_stopped(slot)?;
            self.step(slot)?;
        }

        self.report.pacing = self.policy.stats();
        Ok(self.report)
    }

    /// Advance the state machine by one decoder (or filter) interaction.
    fn step(&mut self, slot: &FrameSlot) -> Result<(), RelayError> {
        match self.phase {
            Phase::Decoding => match self.decoder.next_raw_frame()? {
                Some(raw) => self.filter_and_publish(Some(raw), slot)?,
                None => {
                    util::debug_log_info!(
                        "Input exhausted after {} frames, flushing the decoder.",
                        self.report.decoded
                    );
                    self.decoder.flush()?;
                    self.phase = Phase::FlushingDecoder;
                }
            },

            Phase::FlushingDecoder => match self.decoder.next_raw_frame()? {
                Some(raw) => self.filter_and_publish(Some(raw), slot)?,
                None => {
                    util::debug_log_info!("Decoder drained, flushing the filter.");
                    self.phase = Phase::FlushingFilter;
                }
            },

            Phase::FlushingFilter => {
                self.filter_and_publish(None, slot)?;
                self.phase = Phase::Done;
            }

            Phase::Done => {}
        }

        Ok(())
    }

    /// Push `raw` (or a flush) into the filter, then handle every frame that's
    /// ready to come out before asking for more input.
    fn filter_and_publish(&mut self, raw: Option<D::Frame>, slot: &FrameSlot) -> Result<(), RelayError> {
        if raw.is_some() {
            self.report.decoded += 1;
        }
        self.filter.push(raw)?;

        while let Some(frame) = self.filter.pull()? {
            self.report.filtered += 1;
            self.ensure_not_stopped(slot)?;
            self.pace_and_publish(frame, slot);
        }

        Ok(())
    }

    fn pace_and_publish(&mut self, frame: Frame, slot: &FrameSlot) {
        match self.policy.evaluate(frame.pts()) {
            Decision::Display => {
                let published = slot.publish(frame);
                self.report.published += 1;
                if published.replaced {
                    self.report.overwritten += 1;
                }
            }

            Decision::Drop => {
                self.report.dropped_late += 1;
                util::debug_log_info!("Dropping late frame {:?}.", frame.pts());
            }
        }
    }

    fn ensure_not_stopped(&self, slot: &FrameSlot) -> Result<(), RelayError> {
        if slot.is_closed() {
            util::debug_log_warning!("The frame slot was closed, stopping the producer.");
            return Err(RelayError::Cancelled);
        }

        if (self.should_stop)() {
            util::debug_log_info!("Stop requested, stopping the producer.");
            return Err(RelayError::Cancelled);
        }

        Ok(())
    }
}
