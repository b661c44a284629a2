//! FFmpeg-backed [Decoder](relay::Decoder) and [Filter](relay::Filter)
//! implementations for the relay.

#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicBool, Ordering};

use ctor::ctor;
use ffmpeg_next as ffmpeg;

mod decoder;
mod filter;
mod pixels;

pub use decoder::VideoDecoder;
pub use filter::ScaleFilter;
pub use pixels::VideoPixels;

pub use ffmpeg::format::Pixel as PixelFormat;

/// The pixel format the panel takes: 16-bit RGB565, most significant byte
/// first.
pub const PANEL_PIXEL_FORMAT: PixelFormat = PixelFormat::RGB565BE;

/// Something went wrong inside this crate's FFmpeg wiring (as opposed to in
/// FFmpeg itself).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("FFmpeg has no `{0}` filter.")]
    MissingFilter(&'static str),
    #[error("The filter graph has no `{0}` filter instance.")]
    MissingFilterContext(&'static str),
    #[error("The filter graph produced {actual:?} frames instead of {expected:?}.")]
    UnexpectedPixelFormat {
        expected: PixelFormat,
        actual: PixelFormat,
    },
    #[error("The filter expression is empty.")]
    EmptyExpression,
}

/// Returns whether an FFmpeg error just means "nothing available right now"
/// (`EAGAIN`) or "nothing available ever again" (`EOF`).
pub(crate) fn is_drained(err: &ffmpeg::Error) -> bool {
    matches!(
        err,
        ffmpeg::Error::Eof | ffmpeg::Error::Other {
            errno: ffmpeg::util::error::EAGAIN
        }
    )
}

/// Initializes FFmpeg. This happens when the [crate] is loaded.
///
/// You should never actually call this function.
#[ctor]
fn ffmpeg_init() {
    #[cfg(debug_assertions)]
    {
        static ALREADY_INIT: AtomicBool = AtomicBool::new(false);
        assert!(
            !ALREADY_INIT.swap(true, Ordering::SeqCst),
            "Tried to initialize FFmpeg twice."
        );
    }

    ffmpeg::init().expect("FFmpeg shouldn't fail to initialize.");
}
