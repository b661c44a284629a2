//! Debug-build logging for the player.
//!
//! Every line goes to stderr (the panel is the only "real" output). Logging is
//! compiled out when `cfg!(debug_assertions)` is false, otherwise it's enabled
//! by default and can be switched off at runtime with [disable].

pub mod panic_on_errors;

use std::fmt::{self, Arguments, Display, Formatter};
use std::io::{self, IsTerminal, Write};
use std::panic::Location;
#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use time::{OffsetDateTime, UtcOffset};
use time::macros::format_description;

/// Log some info if both `cfg!(debug_assertions)` and [enabled] are true.
#[macro_export]
macro_rules! debug_log_info {
    ($($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        if $crate::debug_log::enabled() {
            $crate::debug_log::emit(
                $crate::debug_log::Level::Info,
                ::std::format_args!($($arg)*),
            );
        }
    }};
}

/// Log a warning if both `cfg!(debug_assertions)` and [enabled] are true.
#[macro_export]
macro_rules! debug_log_warning {
    ($($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        if $crate::debug_log::enabled() {
            $crate::debug_log::emit(
                $crate::debug_log::Level::Warning,
                ::std::format_args!($($arg)*),
            );
        }
    }};
}

/// Log an error if both `cfg!(debug_assertions)` and [enabled] are true. If
/// [panic_on_errors] is enabled as well, this panics after logging.
#[macro_export]
macro_rules! debug_log_error {
    ($($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        if $crate::debug_log::enabled() {
            $crate::debug_log::emit(
                $crate::debug_log::Level::Error,
                ::std::format_args!($($arg)*),
            );

            if $crate::debug_log::panic_on_errors::enabled() {
                panic!("Panicking on error logging enabled.");
            }
        }
    }};
}

/// How loud a log line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    fn color(self) -> &'static str {
        match self {
            Level::Info => "\x1b[35m",
            Level::Warning => "\x1b[33m",
            Level::Error => "\x1b[31m",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        })
    }
}

/// Whether logging is enabled or not.
///
/// Logging cannot be enabled when `cfg!(debug_assertions)` is false, otherwise
/// it's enabled by default.
#[inline(always)]
pub fn enabled() -> bool {
    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn enabled_impl() -> bool {
        false
    }

    #[cfg(debug_assertions)]
    #[inline(always)]
    fn enabled_impl() -> bool {
        ENABLED.load(Ordering::Relaxed)
    }

    enabled_impl()
}

/// Disable logging.
#[inline(always)]
pub fn disable() {
    #[cfg(debug_assertions)]
    ENABLED.store(false, Ordering::Relaxed);
}

/// Enable logging. Panics when `cfg!(debug_assertions)` is false.
#[inline(always)]
pub fn enable() {
    #[cfg(not(debug_assertions))]
    panic!("Debug logging cannot be enabled.");

    #[cfg(debug_assertions)]
    ENABLED.store(true, Ordering::Relaxed);
}

/// Write one log line with the caller's location and the local wall-clock
/// time.
///
/// This function gets called by the debug log macros (e.g. [debug_log_info])
/// and generally shouldn't be called directly.
#[track_caller]
pub fn emit(level: Level, message: Arguments<'_>) {
    let stderr = io::stderr();
    let (color, reset_color) = if stderr.is_terminal() {
        (level.color(), "\x1b[0m")
    } else {
        ("", "")
    };

    let loc = Location::caller();

    // Frames are logged from two threads at once, so the whole line is written
    // under one lock to keep them from interleaving.
    _ = writeln!(
        stderr.lock(),
        "{} [{color}{level}{reset_color}] {}:{}: {message}",
        timestamp(),
        loc.file(),
        loc.line(),
    );
}

/// The offset log timestamps are shown in, read once and kept for the rest of
/// the process.
///
/// Call this from `main` before spawning any threads. The system offset can
/// only be read while the process is single-threaded, so a first call made
/// later settles on UTC.
pub fn capture_local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

/// `HH:MM:SS.ffffff` in the offset from [capture_local_offset].
fn timestamp() -> String {
    let now = OffsetDateTime::now_utc().to_offset(capture_local_offset());

    now.format(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:6]"
    ))
    .unwrap_or_else(|e| format!("<unknown time: {e}>"))
}

#[cfg(debug_assertions)]
static ENABLED: AtomicBool = AtomicBool::new(true);

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();
