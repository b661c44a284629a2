//! The errors a playback session can fail with.
//!
//! Every one of them is fatal to the session. End of stream is not an error
//! and never shows up here.

use std::error::Error;
use std::io;

use thiserror::Error;

use crate::frame::FrameError;

/// A boxed error from a collaborator's own library (FFmpeg, the SPI driver).
pub type BoxedError = Box<dyn Error + Send + Sync>;

/// The decoder failed in a way the stream can't recover from.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to read from the input: {0}")]
    Read(#[source] BoxedError),
    #[error("Failed to decode a frame: {0}")]
    Decode(#[source] BoxedError),
    #[error("Failed to flush the decoder: {0}")]
    Flush(#[source] BoxedError),
}

/// The filter graph couldn't be set up or failed while running.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Failed to configure the filter graph: {0}")]
    Configure(#[source] BoxedError),
    #[error("Failed to push a frame into the filter graph: {0}")]
    Push(#[source] BoxedError),
    #[error("Failed to pull a frame out of the filter graph: {0}")]
    Pull(#[source] BoxedError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Pixels couldn't be sent to the output device.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to configure the output: {0}")]
    Configure(#[source] BoxedError),
    #[error("Failed to transmit to the output: {0}")]
    Transmit(#[source] BoxedError),
    #[error("A frame row is {available} bytes but the output region needs {required}.")]
    FrameTooNarrow { required: usize, available: usize },
    #[error("The output region {0} is empty or inverted.")]
    InvalidRegion(crate::pipeline::Region),
}

/// The input can't be played at all.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open the input: {0}")]
    Open(#[source] BoxedError),
    #[error("The input has no video stream.")]
    NoVideoStream,
    #[error("The video stream is {width}x{height}, which has no area.")]
    EmptyVideo { width: u32, height: u32 },
    #[error("The video stream has an unusable time base ({0}).")]
    InvalidTimeBase(crate::time::Rational),
}

/// Why a playback session ended early.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Playback was stopped before the stream ended.")]
    Cancelled,
    #[error("Failed to start the consumer thread: {0}")]
    SpawnConsumer(#[source] io::Error),
    #[error("The consumer thread panicked.")]
    ConsumerPanicked,
}

impl RelayError {
    /// Whether this is only the echo of a stop (a closed slot or a stop
    /// request) rather than a failure of its own.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RelayError::Cancelled)
    }
}
