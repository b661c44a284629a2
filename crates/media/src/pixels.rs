use ffmpeg::frame::Video as FFmpegVideoFrame;
use ffmpeg_next as ffmpeg;

use relay::PixelBuffer;

/// A [PixelBuffer] that is just the first plane of a filtered FFmpeg frame, so
/// nothing gets copied on the way to the panel.
pub struct VideoPixels(FFmpegVideoFrame);

impl VideoPixels {
    pub fn new(frame: FFmpegVideoFrame) -> Self {
        Self(frame)
    }
}

impl PixelBuffer for VideoPixels {
    fn bytes(&self) -> &[u8] {
        self.0.data(0)
    }

    fn linesize(&self) -> usize {
        self.0.stride(0)
    }

    fn rows(&self) -> usize {
        self.0.height() as usize
    }
}
