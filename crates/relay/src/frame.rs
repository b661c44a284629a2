//! This module declares the [Frame] type and the [PixelBuffer] trait for the
//! storage it owns.
//!
//! A [Frame] is only ever *moved* between the decoder, the
//! [FrameSlot](crate::FrameSlot) and the consumer. It isn't [Clone]: at any
//! time exactly one of them owns the pixels.

use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::time::Timestamp;

/// Owning storage for one display-ready picture, laid out as `rows()` rows
/// that start every `linesize()` bytes.
///
/// # Contract
///
/// - `bytes().len() >= linesize() * rows()`.
/// - Repeated calls return the same values for the lifetime of the buffer.
pub trait PixelBuffer: Send + 'static {
    /// The raw bytes, starting at the first row.
    fn bytes(&self) -> &[u8];

    /// The distance between the starts of two rows, in bytes. This can be
    /// larger than the visible row (padding).
    fn linesize(&self) -> usize;

    /// The number of rows.
    fn rows(&self) -> usize;
}

/// A [PixelBuffer] backed by a plain heap allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct PackedPixels {
    data: Box<[u8]>,
    linesize: usize,
    rows: usize,
}

impl PackedPixels {
    /// Wrap `data`, returning an error if it can't hold `rows` rows of
    /// `linesize` bytes.
    pub fn new(data: impl Into<Box<[u8]>>, linesize: usize, rows: usize) -> Result<Self, FrameError> {
        let data = data.into();
        let required = linesize
            .checked_mul(rows)
            .ok_or(FrameError::SizeOverflow { linesize, rows })?;

        if data.len() < required {
            return Err(FrameError::BufferTooShort {
                required,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            linesize,
            rows,
        })
    }

    /// A zeroed (black, in RGB565) buffer.
    pub fn zeroed(linesize: usize, rows: usize) -> Self {
        Self {
            data: vec![0; linesize * rows].into_boxed_slice(),
            linesize,
            rows,
        }
    }
}

impl PixelBuffer for PackedPixels {
    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn linesize(&self) -> usize {
        self.linesize
    }

    fn rows(&self) -> usize {
        self.rows
    }
}

impl Debug for PackedPixels {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedPixels")
            .field("len", &self.data.len())
            .field("linesize", &self.linesize)
            .field("rows", &self.rows)
            .finish()
    }
}

/// A process-unique frame identity. Two [Frame]s never share one, which is
/// what lets tests check that a frame is never handed out twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u64);

impl FrameId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A decoded, filtered, display-ready picture plus its presentation
/// timestamp.
pub struct Frame {
    id: FrameId,
    pts: Option<Timestamp>,
    buffer: Box<dyn PixelBuffer>,
}

impl Frame {
    /// Create a frame from any type that implements [PixelBuffer].
    pub fn new<B: PixelBuffer>(buffer: B, pts: Option<Timestamp>) -> Self {
        Self::from_boxed(Box::new(buffer), pts)
    }

    /// Create a frame from an already boxed [PixelBuffer].
    pub fn from_boxed(buffer: Box<dyn PixelBuffer>, pts: Option<Timestamp>) -> Self {
        Self {
            id: FrameId::next(),
            pts,
            buffer,
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    /// The presentation timestamp, or [None] if the source had no timing for
    /// this frame.
    pub fn pts(&self) -> Option<Timestamp> {
        self.pts
    }

    pub fn bytes(&self) -> &[u8] {
        self.buffer.bytes()
    }

    pub fn linesize(&self) -> usize {
        self.buffer.linesize()
    }

    pub fn rows(&self) -> usize {
        self.buffer.rows()
    }

    /// Row `index`, `len` bytes long, or [None] if that runs past the buffer.
    pub fn row(&self, index: usize, len: usize) -> Option<&[u8]> {
        let start = index.checked_mul(self.linesize())?;
        self.bytes().get(start..start.checked_add(len)?)
    }

    /// Give up the frame, returning the storage it owned.
    pub fn into_buffer(self) -> Box<dyn PixelBuffer> {
        self.buffer
    }
}

impl Debug for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("pts", &self.pts)
            .field("linesize", &self.linesize())
            .field("rows", &self.rows())
            .finish()
    }
}

/// Indicates that pixel storage didn't have the shape it claimed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("A frame buffer needs {required} bytes but only has {actual}.")]
    BufferTooShort { required: usize, actual: usize },
    #[error("{rows} rows of {linesize} bytes doesn't fit in memory.")]
    SizeOverflow { linesize: usize, rows: usize },
}
