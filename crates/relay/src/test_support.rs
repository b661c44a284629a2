//! Fakes for every collaborator of the relay, shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::error::{DecodeError, FilterError, SinkError};
use crate::frame::{Frame, PackedPixels};
use crate::pipeline::{Decoder, Filter, OutputSink, Region, StreamInfo};
use crate::slot::FrameSlot;
use crate::time::{MICROSECONDS, Rational, Timestamp};

/// Fake frames are 4 RGB565 pixels wide and 3 rows tall, unpadded.
const FRAME_LINESIZE: usize = 8;
const FRAME_ROWS: usize = 3;

/// The region fake frames fill exactly.
pub const TEST_REGION: Region = Region::new(0, 0, 3, 2);

/// A clock that only moves when told to. Sleeping advances it instantly.
#[derive(Debug, Default)]
pub struct FakeClock {
    now: AtomicI64,
    sleeps: Mutex<Vec<i64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, micros: i64) {
        self.now.store(micros, Ordering::SeqCst);
    }

    pub fn advance(&self, micros: i64) {
        self.now.fetch_add(micros, Ordering::SeqCst);
    }

    /// Every positive sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<i64> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for FakeClock {
    fn now_micros(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep_micros(&self, micros: i64) {
        if micros > 0 {
            self.sleeps.lock().unwrap().push(micros);
            self.advance(micros);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The decoder handed out the frame with this pts (in microseconds).
    Decoded(i64),
    DecoderFlushed,
    FilterFlushed,
}

/// Records the order fakes were called in, across fakes.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }
}

/// A frame filled with `marker`, so tests can tell which one reached a sink.
fn marked_frame(marker: u8, pts: i64) -> Frame {
    let pixels = PackedPixels::new(
        vec![marker; FRAME_LINESIZE * FRAME_ROWS],
        FRAME_LINESIZE,
        FRAME_ROWS,
    )
    .unwrap();
    Frame::new(pixels, Some(Timestamp::from_micros(pts)))
}

/// A decoder that hands out a fixed list of frames. Frame `n` is filled with
/// the byte `n`.
pub struct ScriptedDecoder {
    pending: VecDeque<i64>,
    produced: usize,
    held_back: usize,
    flushed: bool,
    fail_after: Option<usize>,
    on_decode: Option<Box<dyn FnMut() + Send>>,
    log: Option<EventLog>,
    time_base: Rational,
}

impl ScriptedDecoder {
    pub fn with_pts(pts: impl IntoIterator<Item = i64>) -> Self {
        Self {
            pending: pts.into_iter().collect(),
            produced: 0,
            held_back: 0,
            flushed: false,
            fail_after: None,
            on_decode: None,
            log: None,
            time_base: MICROSECONDS,
        }
    }

    /// Only changes what [Decoder::stream_info] reports.
    pub fn with_time_base(mut self, time_base: Rational) -> Self {
        self.time_base = time_base;
        self
    }

    /// Keep the last `frames` frames until flushed, like a decoder with
    /// reordering delay.
    pub fn holding_back(mut self, frames: usize) -> Self {
        self.held_back = frames;
        self
    }

    /// Fail instead of producing frame number `frames`.
    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Called every time a frame is handed out.
    pub fn on_decode(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_decode = Some(Box::new(hook));
        self
    }

    pub fn logging_to(mut self, log: &EventLog) -> Self {
        self.log = Some(log.clone());
        self
    }
}

impl Decoder for ScriptedDecoder {
    type Frame = Frame;

    fn stream_info(&self) -> StreamInfo {
        StreamInfo {
            width: (FRAME_LINESIZE / 2) as u32,
            height: FRAME_ROWS as u32,
            time_base: self.time_base,
            frame_rate: None,
            sample_aspect_ratio: Rational::new(1, 1),
        }
    }

    fn next_raw_frame(&mut self) -> Result<Option<Frame>, DecodeError> {
        if self.fail_after == Some(self.produced) {
            return Err(DecodeError::Decode("scripted decode failure".into()));
        }
        if !self.flushed && self.pending.len() <= self.held_back {
            return Ok(None);
        }
        let Some(pts) = self.pending.pop_front() else {
            return Ok(None);
        };

        let frame = marked_frame(self.produced as u8, pts);
        self.produced += 1;

        if let Some(hook) = &mut self.on_decode {
            hook();
        }
        if let Some(log) = &self.log {
            log.push(Event::Decoded(pts));
        }

        Ok(Some(frame))
    }

    fn flush(&mut self) -> Result<(), DecodeError> {
        self.flushed = true;
        if let Some(log) = &self.log {
            log.push(Event::DecoderFlushed);
        }
        Ok(())
    }
}

/// A filter that passes frames through, optionally holding some back or
/// emitting each one several times.
pub struct FakeFilter {
    queue: VecDeque<Frame>,
    delay: usize,
    copies: usize,
    flushed: bool,
    emitted: usize,
    fail_after: Option<usize>,
    log: Option<EventLog>,
}

impl FakeFilter {
    pub fn passthrough() -> Self {
        Self {
            queue: VecDeque::new(),
            delay: 0,
            copies: 1,
            flushed: false,
            emitted: 0,
            fail_after: None,
            log: None,
        }
    }

    /// Only release a frame once `frames` newer ones have been pushed (or the
    /// filter is flushed).
    pub fn delaying(frames: usize) -> Self {
        Self {
            delay: frames,
            ..Self::passthrough()
        }
    }

    /// Emit every frame `copies` times.
    pub fn duplicating(copies: usize) -> Self {
        Self {
            copies,
            ..Self::passthrough()
        }
    }

    /// Fail when asked for frame number `frames` while one is ready.
    pub fn failing_after(frames: usize) -> Self {
        Self {
            fail_after: Some(frames),
            ..Self::passthrough()
        }
    }

    pub fn logging_to(mut self, log: &EventLog) -> Self {
        self.log = Some(log.clone());
        self
    }
}

impl Filter for FakeFilter {
    type Input = Frame;

    fn push(&mut self, frame: Option<Frame>) -> Result<(), FilterError> {
        let Some(frame) = frame else {
            self.flushed = true;
            if let Some(log) = &self.log {
                log.push(Event::FilterFlushed);
            }
            return Ok(());
        };

        for _ in 1..self.copies {
            let pixels = PackedPixels::new(frame.bytes(), frame.linesize(), frame.rows())?;
            self.queue.push_back(Frame::new(pixels, frame.pts()));
        }
        self.queue.push_back(frame);
        Ok(())
    }

    fn pull(&mut self) -> Result<Option<Frame>, FilterError> {
        if self.queue.is_empty() || (!self.flushed && self.queue.len() <= self.delay) {
            return Ok(None);
        }
        if self.fail_after == Some(self.emitted) {
            return Err(FilterError::Pull("scripted filter failure".into()));
        }

        self.emitted += 1;
        Ok(self.queue.pop_front())
    }
}

#[derive(Debug)]
struct Transmission {
    started: Instant,
    marker: Option<u8>,
}

/// A sink that remembers what it was sent, optionally slowly or only for a
/// while.
#[derive(Debug, Default)]
pub struct RecordingSink {
    configured: Option<Region>,
    frames: Vec<Transmission>,
    bytes: usize,
    frame_delay: Duration,
    fail_after: Option<usize>,
}

impl RecordingSink {
    /// Bytes in one fake frame sent to [TEST_REGION].
    pub const FRAME_BYTES: usize = FRAME_LINESIZE * FRAME_ROWS;

    pub fn new() -> Self {
        Self::default()
    }

    /// Block for `delay` at the start of every frame, like a slow bus.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// Fail when frame number `frames` starts.
    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn configured(&self) -> Option<Region> {
        self.configured
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn bytes_received(&self) -> usize {
        self.bytes
    }

    /// When each frame started arriving.
    pub fn frame_starts(&self) -> Vec<Instant> {
        self.frames.iter().map(|frame| frame.started).collect()
    }

    /// The first byte of each frame, which is the decoder's index for it.
    pub fn frame_markers(&self) -> Vec<u8> {
        self.frames.iter().filter_map(|frame| frame.marker).collect()
    }
}

impl OutputSink for RecordingSink {
    fn configure(&mut self, region: Region) -> Result<(), SinkError> {
        self.configured = Some(region);
        Ok(())
    }

    fn transmit(&mut self, data: &[u8], continuation: bool) -> Result<(), SinkError> {
        if !continuation {
            if self.fail_after == Some(self.frames.len()) {
                return Err(SinkError::Transmit("scripted transmit failure".into()));
            }
            self.frames.push(Transmission {
                started: Instant::now(),
                marker: None,
            });
            thread::sleep(self.frame_delay);
        }

        if let Some(frame) = self.frames.last_mut() {
            if frame.marker.is_none() {
                frame.marker = data.first().copied();
            }
        }
        self.bytes += data.len();
        Ok(())
    }
}

/// Take everything left in a closed slot, as pts in microseconds.
pub fn drain(slot: &FrameSlot) -> Vec<Option<i64>> {
    let mut frames = Vec::new();
    while let Some(frame) = slot.check() {
        frames.push(frame.pts().map(|pts| pts.as_micros()));
    }
    frames
}
