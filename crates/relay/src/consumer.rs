//! Contains [ConsumerLoop], the side of a session that sends frames to the
//! output.

use std::time::{Duration, Instant};

use crate::error::SinkError;
use crate::frame::Frame;
use crate::pipeline::{OutputSink, Region};
use crate::slot::{CloseOnDrop, FrameSlot};

/// Output pixels are 16-bit RGB565.
pub const BYTES_PER_PIXEL: usize = 2;

/// Counters for one consumer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumerReport {
    /// Frames fully transmitted.
    pub frames: u64,
    /// Pixel bytes transmitted (window selection commands not included).
    pub bytes: u64,
    /// Time spent inside the sink.
    pub busy: Duration,
}

/// Waits on a [FrameSlot] and sends every frame it takes to an [OutputSink].
///
/// It never asks for a specific frame: whatever is newest when it wakes up is
/// what gets shown, and it never keeps a frame past the iteration that showed
/// it.
#[derive(Debug)]
pub struct ConsumerLoop<S> {
    sink: S,
    region: Region,
    report: ConsumerReport,
}

impl<S: OutputSink> ConsumerLoop<S> {
    /// `region` is where on the device frames are drawn. Its width decides how
    /// many bytes of each frame row are sent.
    pub fn new(sink: S, region: Region) -> Self {
        Self {
            sink,
            region,
            report: ConsumerReport::default(),
        }
    }

    /// Configure the sink, then transmit frames until the slot is closed and
    /// empty.
    ///
    /// If the sink fails, the slot is closed so the producer stops too.
    pub fn run(mut self, slot: &FrameSlot) -> Result<ConsumerReport, SinkError> {
        let _close = CloseOnDrop::new(slot);

        if !self.region.is_valid() {
            return Err(SinkError::InvalidRegion(self.region));
        }
        self.sink.configure(self.region)?;

        while let Some(frame) = slot.take_latest(true) {
            self.present(&frame).inspect_err(|e| {
                util::debug_log_error!("Failed to transmit frame {:?}: {e}", frame.id());
            })?;
        }

        util::debug_log_info!(
            "Consumer done: {} frames, {} bytes, {:?} in the sink.",
            self.report.frames,
            self.report.bytes,
            self.report.busy
        );

        Ok(self.report)
    }

    /// Transmit one frame: re-select the write window, then send the rows
    /// that fit in the region.
    pub fn present(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let started = Instant::now();

        let row_len = self.region.width() * BYTES_PER_PIXEL;
        let rows = frame.rows().min(self.region.height());

        if frame.linesize() < row_len {
            return Err(SinkError::FrameTooNarrow {
                required: row_len,
                available: frame.linesize(),
            });
        }

        self.sink.transmit(&[], false)?;

        if frame.linesize() == row_len {
            // No padding between rows, so the whole picture goes out at once.
            let len = rows * row_len;
            let data = frame.bytes().get(..len).ok_or(SinkError::FrameTooNarrow {
                required: len,
                available: frame.bytes().len(),
            })?;
            if !data.is_empty() {
                self.sink.transmit(data, true)?;
            }
        } else {
            for row in 0..rows {
                let data = frame.row(row, row_len).ok_or(SinkError::FrameTooNarrow {
                    required: row_len,
                    available: frame.bytes().len().saturating_sub(row * frame.linesize()),
                })?;
                self.sink.transmit(data, true)?;
            }
        }

        let elapsed = started.elapsed();
        self.report.frames += 1;
        self.report.bytes += (rows * row_len) as u64;
        self.report.busy += elapsed;

        util::debug_log_info!("Frame {:?} transmitted in {elapsed:?}.", frame.id());

        Ok(())
    }

    pub fn report(&self) -> ConsumerReport {
        self.report
    }
}
