//! The module contains [ScaleFilter], a [Filter] that runs decoded frames
//! through an FFmpeg filter graph ending in the panel's pixel format.

use ffmpeg::filter::Context as FFmpegFilterContext;
use ffmpeg::filter::Graph as FFmpegFilterGraph;
use ffmpeg::format::Pixel as FFmpegPixelFormat;
use ffmpeg::frame::Video as FFmpegVideoFrame;
use ffmpeg_next as ffmpeg;

use relay::{Filter, FilterError, Frame, Rational, StreamInfo, Timestamp};

use crate::{MediaError, PANEL_PIXEL_FORMAT, VideoPixels, is_drained};

const SOURCE: &str = "in";
const SINK: &str = "out";

/// Scales, rotates and converts frames with an FFmpeg filter graph described
/// by an expression like `scale=320:240,transpose=clock`.
///
/// Frames come out in [PANEL_PIXEL_FORMAT], stamped in the input stream's time
/// base.
pub struct ScaleFilter {
    graph: FFmpegFilterGraph,
    time_base: Rational,
}

impl ScaleFilter {
    /// Build the graph `buffer → expression → buffersink` for frames
    /// described by `info` and `pixel_format`.
    pub fn new(
        info: &StreamInfo,
        pixel_format: FFmpegPixelFormat,
        expression: &str,
    ) -> Result<Self, FilterError> {
        let filter = Self::build(info, pixel_format, expression).map_err(FilterError::Configure)?;
        util::debug_log_info!("Filter graph ready: {expression}");
        Ok(filter)
    }

    fn build(
        info: &StreamInfo,
        pixel_format: FFmpegPixelFormat,
        expression: &str,
    ) -> Result<Self, relay::BoxedError> {
        if expression.trim().is_empty() {
            return Err(MediaError::EmptyExpression.into());
        }

        let buffer = ffmpeg::filter::find("buffer").ok_or(MediaError::MissingFilter("buffer"))?;
        let buffersink =
            ffmpeg::filter::find("buffersink").ok_or(MediaError::MissingFilter("buffersink"))?;

        let args = format!(
            "video_size={}x{}:pix_fmt={}:time_base={}:pixel_aspect={}",
            info.width,
            info.height,
            ffmpeg::ffi::AVPixelFormat::from(pixel_format) as i32,
            info.time_base,
            info.sample_aspect_ratio,
        );

        let mut graph = FFmpegFilterGraph::new();
        graph.add(&buffer, SOURCE, &args)?;
        graph.add(&buffersink, SINK, "")?;
        graph
            .get(SINK)
            .ok_or(MediaError::MissingFilterContext(SINK))?
            .set_pixel_format(PANEL_PIXEL_FORMAT);

        // The graph's open ends are named from the expression's point of view:
        // our source feeds its input and our sink takes its output.
        graph.output(SOURCE, 0)?.input(SINK, 0)?.parse(expression)?;
        graph.validate()?;

        Ok(Self {
            graph,
            time_base: info.time_base,
        })
    }

    fn context(&mut self, name: &'static str) -> Result<FFmpegFilterContext<'_>, MediaError> {
        self.graph
            .get(name)
            .ok_or(MediaError::MissingFilterContext(name))
    }

    fn wrap(&self, frame: FFmpegVideoFrame) -> Result<Frame, FilterError> {
        if frame.format() != PANEL_PIXEL_FORMAT {
            return Err(FilterError::Pull(Box::new(MediaError::UnexpectedPixelFormat {
                expected: PANEL_PIXEL_FORMAT,
                actual: frame.format(),
            })));
        }

        let pts = frame.pts().map(|pts| Timestamp::new(pts, self.time_base));
        Ok(Frame::new(VideoPixels::new(frame), pts))
    }
}

impl Filter for ScaleFilter {
    type Input = FFmpegVideoFrame;

    fn push(&mut self, frame: Option<FFmpegVideoFrame>) -> Result<(), FilterError> {
        let mut source = self
            .context(SOURCE)
            .map_err(|e| FilterError::Push(Box::new(e)))?;

        let result = match &frame {
            Some(frame) => source.source().add(frame),
            None => source.source().flush(),
        };
        result.map_err(|e| FilterError::Push(Box::new(e)))
    }

    fn pull(&mut self) -> Result<Option<Frame>, FilterError> {
        let mut frame = FFmpegVideoFrame::empty();
        let result = self
            .context(SINK)
            .map_err(|e| FilterError::Pull(Box::new(e)))?
            .sink()
            .frame(&mut frame);

        match result {
            Ok(()) => self.wrap(frame).map(Some),
            Err(e) if is_drained(&e) => Ok(None),
            Err(e) => Err(FilterError::Pull(Box::new(e))),
        }
    }
}
