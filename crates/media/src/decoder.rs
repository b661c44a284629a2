//! The module contains [VideoDecoder], a [Decoder] that can read almost any
//! kind of video file (using FFmpeg).

use std::path::Path;

use ffmpeg::codec::Context as FFmpegCodecContext;
use ffmpeg::codec::decoder::Video as FFmpegVideoDecoder;
use ffmpeg::format::Pixel as FFmpegPixelFormat;
use ffmpeg::format::context::Input as FFmpegInputFormatContext;
use ffmpeg::frame::Video as FFmpegVideoFrame;
use ffmpeg::media::Type as FFmpegMediaType;
use ffmpeg::packet::Packet as FFmpegPacket;
use ffmpeg_next as ffmpeg;

use relay::{ConfigError, DecodeError, Decoder, Rational, StreamInfo};

use crate::is_drained;

/// Decodes the best video stream of a file into raw FFmpeg frames, each
/// stamped with its best-effort timestamp.
pub struct VideoDecoder {
    input_context: FFmpegInputFormatContext,
    decoder: FFmpegVideoDecoder,
    video_stream_index: usize,
    info: StreamInfo,
    input_exhausted: bool,
    flushed: bool,
}

impl VideoDecoder {
    /// Open a video file from its path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::open_impl(path.as_ref())
    }

    fn open_impl(path: &Path) -> Result<Self, ConfigError> {
        // This only reads the container's metadata, no video data yet.
        let input_context =
            ffmpeg::format::input(path).map_err(|e| ConfigError::Open(Box::new(e)))?;

        // Let FFmpeg pick the video stream it thinks is best.
        let video_stream = input_context
            .streams()
            .best(FFmpegMediaType::Video)
            .ok_or(ConfigError::NoVideoStream)?;
        let video_stream_index = video_stream.index();

        let decoder = FFmpegCodecContext::from_parameters(video_stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|e| ConfigError::Open(Box::new(e)))?;

        if decoder.width() == 0 || decoder.height() == 0 {
            return Err(ConfigError::EmptyVideo {
                width: decoder.width(),
                height: decoder.height(),
            });
        }

        let time_base = rational(video_stream.time_base());
        if !time_base.is_valid() || time_base.den < 0 {
            return Err(ConfigError::InvalidTimeBase(time_base));
        }

        let frame_rate = Some(rational(video_stream.avg_frame_rate())).filter(Rational::is_valid);

        let info = StreamInfo {
            width: decoder.width(),
            height: decoder.height(),
            time_base,
            frame_rate,
            sample_aspect_ratio: rational(decoder.aspect_ratio()),
        };

        util::debug_log_info!(
            "Opened `{}`: {}x{} {:?}, time base {}, frame rate {:?}.",
            path.display(),
            info.width,
            info.height,
            decoder.format(),
            info.time_base,
            info.frame_rate
        );

        Ok(Self {
            input_context,
            decoder,
            video_stream_index,
            info,
            input_exhausted: false,
            flushed: false,
        })
    }

    /// The format decoded frames come out in, which the filter graph's source
    /// has to be told about.
    pub fn pixel_format(&self) -> FFmpegPixelFormat {
        self.decoder.format()
    }

    /// Load the next packet of our stream into the decoder. Returns `false`
    /// once the file has no packets left.
    fn feed_packet(&mut self) -> Result<bool, DecodeError> {
        let mut packet = FFmpegPacket::empty();

        loop {
            match packet.read(&mut self.input_context) {
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => return Ok(false),
                Err(e) => return Err(DecodeError::Read(Box::new(e))),
            }

            // Containers interleave other streams (audio, subtitles) that we
            // skip.
            if packet.stream() == self.video_stream_index {
                self.decoder
                    .send_packet(&packet)
                    .map_err(|e| DecodeError::Decode(Box::new(e)))?;
                return Ok(true);
            }
        }
    }
}

impl Decoder for VideoDecoder {
    type Frame = FFmpegVideoFrame;

    fn stream_info(&self) -> StreamInfo {
        self.info
    }

    fn next_raw_frame(&mut self) -> Result<Option<FFmpegVideoFrame>, DecodeError> {
        loop {
            let mut frame = FFmpegVideoFrame::empty();
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => {
                    let pts = frame.timestamp();
                    frame.set_pts(pts);
                    return Ok(Some(frame));
                }
                Err(e) if is_drained(&e) => {}
                Err(e) => return Err(DecodeError::Decode(Box::new(e))),
            }

            // The decoder wants more input than there is.
            if self.flushed || self.input_exhausted {
                return Ok(None);
            }
            if !self.feed_packet()? {
                self.input_exhausted = true;
                return Ok(None);
            }
        }
    }

    fn flush(&mut self) -> Result<(), DecodeError> {
        self.flushed = true;
        self.decoder
            .send_eof()
            .map_err(|e| DecodeError::Flush(Box::new(e)))
    }
}

fn rational(value: ffmpeg::Rational) -> Rational {
    Rational::new(value.numerator(), value.denominator())
}
