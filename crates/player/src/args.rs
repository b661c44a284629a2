//! Contains [Args], which are parsed command-line flags.

use std::path::PathBuf;

use clap::Parser;

/// Parsed command line arguments.
#[derive(Parser, Debug, Clone, PartialEq, Eq, Hash)]
#[command(about = "Plays a video file on an ST7789 SPI panel.")]
pub struct Args {
    /// The video file to play. Anything FFmpeg can decode works.
    pub video: PathBuf,

    /// Show frames as fast as they decode instead of at the video's frame
    /// rate.
    #[arg(long)]
    pub unpaced: bool,

    /// SPI clock frequency in Hz.
    #[arg(long, default_value_t = 31_250_000)]
    pub spi_clock_hz: u32,

    /// BCM GPIO pin wired to the panel's reset line.
    #[arg(long, default_value_t = 24)]
    pub reset_pin: u8,

    /// BCM GPIO pin wired to the panel's data/command line.
    #[arg(long, default_value_t = 25)]
    pub dc_pin: u8,

    /// The panel's native (portrait) width in pixels.
    #[arg(long, default_value_t = 240, value_parser = clap::value_parser!(u16).range(1..))]
    pub panel_width: u16,

    /// The panel's native (portrait) height in pixels.
    #[arg(long, default_value_t = 320, value_parser = clap::value_parser!(u16).range(1..))]
    pub panel_height: u16,

    #[cfg(debug_assertions)]
    /// Disable debug logging. This option only exists if `debug_assertions` are
    /// enabled.
    #[arg(long)]
    pub no_debug_logging: bool,

    #[cfg(debug_assertions)]
    /// Enable debug error log panics. This option only exists if
    /// `debug_assertions` are enabled.
    #[arg(long, conflicts_with = "no_debug_logging")]
    pub debug_error_log_panics: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self::parse()
    }
}
