//! The playback core: a producer that decodes, filters and paces frames, a
//! consumer that pushes them to an output, and the single-frame slot that
//! connects the two.

pub mod clock;
pub mod consumer;
pub mod error;
pub mod frame;
pub mod pacing;
pub mod pipeline;
pub mod producer;
pub mod session;
pub mod slot;
pub mod time;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, MonotonicClock};
pub use consumer::{ConsumerLoop, ConsumerReport};
pub use error::{BoxedError, ConfigError, DecodeError, FilterError, RelayError, SinkError};
pub use frame::{Frame, FrameError, FrameId, PackedPixels, PixelBuffer};
pub use pacing::{Decision, PacingMode, PacingPolicy, PacingStats};
pub use pipeline::{Decoder, Filter, OutputSink, Region, StreamInfo};
pub use producer::{ProducerLoop, ProducerReport};
pub use session::{Session, SessionConfig, SessionReport};
pub use slot::{FrameSlot, Published};
pub use time::{Rational, Timestamp};
