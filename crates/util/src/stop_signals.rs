//! Polling for stop signals (e.g. `SIGINT` from Ctrl+C).
//!
//! The default handler would kill the process in the middle of an SPI
//! transfer and leave the panel's GPIO lines claimed. With polling enabled the
//! signal is only recorded, and the producer checks [poll] between frames so
//! the session can wind down through its normal teardown path.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use signal_hook::{SigId, consts, low_level};

const THREAD_EXPECT_MSG: &str = "The other thread shouldn't panic.";

/// Replace the default handlers for every termination signal with a counter
/// that [poll] reads. Calling this more than once is fine. Also see [disable].
pub fn enable() -> Result<(), io::Error> {
    let mut sig_ids = SIG_IDS.lock().expect(THREAD_EXPECT_MSG);
    if sig_ids.is_some() {
        return Ok(());
    }

    let mut registered = Vec::with_capacity(consts::TERM_SIGNALS.len());
    for &signal in consts::TERM_SIGNALS {
        // SAFETY: The handler only increments an atomic, which is
        // async-signal safe.
        let result = unsafe {
            low_level::register(signal, || {
                STOP_SIGNALS.fetch_add(1, Ordering::SeqCst);
            })
        };

        match result {
            Ok(sig_id) => registered.push(sig_id),
            Err(e) => {
                crate::debug_log_error!("Failed to register handler for signal {signal}: {e}");
                for sig_id in registered {
                    low_level::unregister(sig_id);
                }
                return Err(e);
            }
        }
    }

    *sig_ids = Some(registered);
    Ok(())
}

/// Restore the default handlers. [poll] keeps returning `true` if a signal
/// was captured before this was called.
pub fn disable() {
    let mut sig_ids = SIG_IDS.lock().expect(THREAD_EXPECT_MSG);
    for sig_id in sig_ids.take().into_iter().flatten() {
        low_level::unregister(sig_id);
    }
}

/// Whether stop signal polling is currently enabled (see [enable]).
pub fn is_enabled() -> bool {
    SIG_IDS.lock().expect(THREAD_EXPECT_MSG).is_some()
}

/// Whether a stop signal has been captured. This doesn't consume the signal,
/// so every thread that asks sees the same answer.
pub fn poll() -> bool {
    STOP_SIGNALS.load(Ordering::SeqCst) > 0
}

static STOP_SIGNALS: AtomicUsize = AtomicUsize::new(0);

static SIG_IDS: Mutex<Option<Vec<SigId>>> = Mutex::new(None);
