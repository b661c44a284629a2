//! The capability contracts of the collaborators around the relay: where
//! frames come from ([Decoder], [Filter]) and where they go ([OutputSink]).
//!
//! Concrete implementations live elsewhere (FFmpeg in `media`, the panel in
//! `panel`, fakes in tests). The relay only ever talks to these traits.

use std::fmt::{self, Display, Formatter};

use crate::error::{DecodeError, FilterError, SinkError};
use crate::frame::Frame;
use crate::time::Rational;

/// What is known about a video stream once it has been opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// The unit the decoder's timestamps count in.
    pub time_base: Rational,
    /// The container's average frame rate, if it declares one.
    pub frame_rate: Option<Rational>,
    pub sample_aspect_ratio: Rational,
}

/// Produces raw (not yet scaled) frames.
///
/// The producer calls [Self::next_raw_frame] until it returns `Ok(None)`
/// ("input exhausted"), then [Self::flush] once, then [Self::next_raw_frame]
/// again until it returns `Ok(None)` a second time ("fully drained").
pub trait Decoder: Send {
    /// The decoder's own frame type, fed straight into a [Filter].
    type Frame;

    /// Stream properties, discoverable as soon as the decoder exists.
    fn stream_info(&self) -> StreamInfo;

    /// The next decoded frame, or [None] if no more can be produced without
    /// flushing (or, after a flush, at all).
    fn next_raw_frame(&mut self) -> Result<Option<Self::Frame>, DecodeError>;

    /// Tell the decoder no more input is coming so it can release the frames
    /// it's holding back.
    fn flush(&mut self) -> Result<(), DecodeError>;
}

/// Turns raw frames into display-ready [Frame]s (scale, rotate, convert).
///
/// A pushed frame can come out as zero, one or several output frames. After
/// `push(None)` the filter flushes and [Self::pull] eventually returns
/// `Ok(None)` for good.
pub trait Filter: Send {
    type Input;

    /// Feed a frame in, or [None] to flush.
    fn push(&mut self, frame: Option<Self::Input>) -> Result<(), FilterError>;

    /// The next finished frame, or [None] once everything pushed so far has
    /// been drained.
    fn pull(&mut self) -> Result<Option<Frame>, FilterError>;
}

/// Somewhere pixels can be sent, a rectangle at a time.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSink {
    /// Select the rectangle following transmissions fill.
    fn configure(&mut self, region: Region) -> Result<(), SinkError>;

    /// Send `data`. With `continuation` unset the device's write window is
    /// re-selected first (a new frame starts), otherwise `data` continues the
    /// frame already being written. `data` may be empty.
    fn transmit(&mut self, data: &[u8], continuation: bool) -> Result<(), SinkError>;
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn configure(&mut self, region: Region) -> Result<(), SinkError> {
        (**self).configure(region)
    }

    fn transmit(&mut self, data: &[u8], continuation: bool) -> Result<(), SinkError> {
        (**self).transmit(data, continuation)
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn configure(&mut self, region: Region) -> Result<(), SinkError> {
        (**self).configure(region)
    }

    fn transmit(&mut self, data: &[u8], continuation: bool) -> Result<(), SinkError> {
        (**self).transmit(data, continuation)
    }
}

/// A rectangle of device pixels, all four edges inclusive (the way display
/// controllers address their write window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl Region {
    pub const fn new(left: u16, top: u16, right: u16, bottom: u16) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// A `width` by `height` rectangle with its top-left corner at
    /// (`left`, `top`), or [None] if it would be empty or leave `u16` range.
    pub fn from_size(left: u16, top: u16, width: u16, height: u16) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        Some(Self {
            left,
            top,
            right: left.checked_add(width - 1)?,
            bottom: top.checked_add(height - 1)?,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom
    }

    /// Width in pixels (`0` if the region is inverted).
    pub fn width(&self) -> usize {
        if self.is_valid() {
            (self.right - self.left) as usize + 1
        } else {
            0
        }
    }

    /// Height in pixels (`0` if the region is inverted).
    pub fn height(&self) -> usize {
        if self.is_valid() {
            (self.bottom - self.top) as usize + 1
        } else {
            0
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}
