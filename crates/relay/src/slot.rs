//! This module defines [FrameSlot], the single-slot mailbox that carries
//! frames from the producer thread to the consumer thread.
//!
//! Unlike a queue, the slot only ever holds the *latest* frame. Publishing
//! over an unconsumed frame drops the old one, so a slow consumer makes the
//! player skip frames instead of piling them up in memory.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::frame::Frame;

const THREAD_PANIC_MSG: &str = "Another thread panicked while holding the frame slot.";

/// A latest-value mailbox for one producer and one consumer. Share it between
/// the two threads by reference (or in an [Arc](std::sync::Arc)).
///
/// `T` is a [Frame] everywhere except in tests.
#[derive(Debug)]
pub struct FrameSlot<T = Frame> {
    state: Mutex<SlotState<T>>,
    notifier: Condvar,
}

#[derive(Debug)]
struct SlotState<T> {
    frame: Option<T>,
    generation: u64,
    finished: bool,
}

/// What happened when a frame was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Published {
    /// The generation number the new frame was installed with.
    pub generation: u64,
    /// Whether an unconsumed frame was thrown away to make room.
    pub replaced: bool,
}

/// A [FrameSlot::wait_timeout] call ran out of time without a frame arriving
/// or the slot closing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No frame arrived within {}+ milliseconds.", timeout.as_millis())]
pub struct SlotTimeout {
    pub timeout: Duration,
}

impl<T> FrameSlot<T> {
    /// An empty, open slot.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                frame: None,
                generation: 0,
                finished: false,
            }),
            notifier: Condvar::new(),
        }
    }

    /// Install `frame` as the latest frame and wake the consumer. Whatever
    /// frame was still waiting in the slot is dropped. Never blocks for longer
    /// than it takes to grab the lock.
    ///
    /// Publishing to a closed slot still installs the frame, so a consumer
    /// draining the slot after [Self::close] sees it.
    pub fn publish(&self, frame: T) -> Published {
        let (published, replaced_frame) = {
            let mut state = self.lock();
            let replaced_frame = state.frame.replace(frame);
            state.generation += 1;

            (
                Published {
                    generation: state.generation,
                    replaced: replaced_frame.is_some(),
                },
                replaced_frame,
            )
        };

        self.notifier.notify_all();

        // Freeing a frame can mean handing a big buffer back to the decoder's
        // pool, so it happens after the lock is released.
        drop(replaced_frame);

        published
    }

    /// Take ownership of the latest frame, leaving the slot empty.
    ///
    /// With `blocking` set this sleeps until a frame is published or the slot
    /// is closed. [None] means the slot was empty and either `blocking` was
    /// unset or the slot is closed.
    pub fn take_latest(&self, blocking: bool) -> Option<T> {
        if blocking { self.wait() } else { self.check() }
    }

    /// Block until a frame is available, then take it. [None] is returned once
    /// the slot is closed and empty.
    pub fn wait(&self) -> Option<T> {
        let mut state = self.lock();

        loop {
            if let Some(frame) = state.frame.take() {
                return Some(frame);
            }

            if state.finished {
                return None;
            }

            // Waking up with nothing in the slot and the slot still open is a
            // spurious wakeup, go back to sleep.
            state = self.notifier.wait(state).expect(THREAD_PANIC_MSG);
        }
    }

    /// Like [Self::wait] but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<T>, SlotTimeout> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if let Some(frame) = state.frame.take() {
                return Ok(Some(frame));
            }

            if state.finished {
                return Ok(None);
            }

            let time_until_deadline = deadline.saturating_duration_since(Instant::now());
            if time_until_deadline.is_zero() {
                return Err(SlotTimeout { timeout });
            }

            state = self
                .notifier
                .wait_timeout(state, time_until_deadline)
                .expect(THREAD_PANIC_MSG)
                .0;
        }
    }

    /// Take the latest frame if there is one, without waiting.
    pub fn check(&self) -> Option<T> {
        self.lock().frame.take()
    }

    /// Mark the stream as finished and wake the consumer. A frame already in
    /// the slot can still be taken, after that every take returns [None]
    /// immediately.
    pub fn close(&self) {
        self.lock().finished = true;
        self.notifier.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().finished
    }

    /// Whether no frame is waiting to be taken.
    pub fn is_empty(&self) -> bool {
        self.lock().frame.is_none()
    }

    /// How many frames have been published so far.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().expect(THREAD_PANIC_MSG)
    }
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes a [FrameSlot] when dropped.
///
/// Hold one for as long as a loop runs and the other side is released on
/// every way out of it: a normal return, an early `?` return, or a panic.
#[derive(Debug)]
pub struct CloseOnDrop<'a, T>(&'a FrameSlot<T>);

impl<'a, T> CloseOnDrop<'a, T> {
    pub fn new(slot: &'a FrameSlot<T>) -> Self {
        Self(slot)
    }
}

impl<T> Drop for CloseOnDrop<'_, T> {
    fn drop(&mut self) {
        self.0.close();
    }
}
