//! Defines [eprintln_and_exit].

/// Print a line to stderr, then call [std::process::exit] with an exit code
/// of `1`.
///
/// Only use this before any hardware has been claimed. Exiting this way skips
/// destructors, so an initialized panel would be left selected.
#[macro_export]
macro_rules! eprintln_and_exit {
    ($($arg:tt)*) => {{
        eprintln!($($arg)*);
        ::std::process::exit(1);
    }};
}
