//! Small pieces of process-level plumbing shared by the player's crates:
//! debug logging, stop-signal polling, and exiting with a message.

pub mod debug_log;
pub mod eprint_and_exit;
pub mod stop_signals;
