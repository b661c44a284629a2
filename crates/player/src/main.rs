mod args;

use std::process::ExitCode;

use media::{ScaleFilter, VideoDecoder};
use panel::{Geometry, PanelSize, SpiBusConfig, St7789};
use relay::{Decoder, PacingMode, RelayError, Session, SessionConfig};
use util::stop_signals;

use args::Args;

fn main() -> ExitCode {
    let args = Args::default();

    #[cfg(debug_assertions)]
    {
        use util::debug_log;
        // Still single-threaded, so the local offset can be read.
        debug_log::capture_local_offset();
        if args.no_debug_logging {
            debug_log::disable();
        } else if args.debug_error_log_panics {
            debug_log::panic_on_errors::enable();
        }
    }

    if let Err(e) = stop_signals::enable() {
        util::eprintln_and_exit!("Failed to listen for stop signals: {e}");
    }

    let decoder = VideoDecoder::open(&args.video).unwrap_or_else(|e| {
        util::eprintln_and_exit!("Can't play `{}`: {e}", args.video.display());
    });
    let info = decoder.stream_info();

    let panel_size = PanelSize {
        width: args.panel_width,
        height: args.panel_height,
    };
    let geometry = Geometry::fit(info.width, info.height, panel_size).unwrap_or_else(|e| {
        util::eprintln_and_exit!("Can't fit the video on the panel: {e}");
    });
    util::debug_log_info!(
        "Fitting {}x{} onto {panel_size} as `{}` in {}.",
        info.width,
        info.height,
        geometry.filter_expression(),
        geometry.region
    );

    let filter = ScaleFilter::new(&info, decoder.pixel_format(), &geometry.filter_expression())
        .unwrap_or_else(|e| util::eprintln_and_exit!("Can't set up scaling: {e}"));

    let bus_config = SpiBusConfig {
        clock_hz: args.spi_clock_hz,
        reset_pin: args.reset_pin,
        dc_pin: args.dc_pin,
    };
    let mut panel = St7789::open(bus_config, panel_size)
        .unwrap_or_else(|e| util::eprintln_and_exit!("Can't open the panel: {e}"));

    let pacing = if args.unpaced {
        PacingMode::Unpaced
    } else {
        PacingMode::Paced
    };
    let config = SessionConfig {
        pacing,
        region: geometry.region,
    };

    let result = Session::new(config)
        .with_stop_check(stop_signals::poll)
        .run(decoder, filter, &mut panel);

    match result {
        Ok(report) => {
            util::debug_log_info!("Played to the end: {report:?}");
            ExitCode::SUCCESS
        }

        Err(RelayError::Cancelled) => {
            eprintln!("Stopped.");
            ExitCode::SUCCESS
        }

        Err(e) => {
            util::debug_log_error!("Playback failed: {e:?}");
            eprintln!("Playback failed: {e}");
            ExitCode::FAILURE
        }
    }
}
