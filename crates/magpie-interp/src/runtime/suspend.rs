//! Cooperative suspend points.
//!
//! The dispatch loop polls its thread's controller once per instruction;
//! a pauser (the collector, a snapshotter, a debugger) raises the flag and
//! every polling thread parks until released. The fast path is a single
//! atomic load so an idle controller costs next to nothing in the hot loop.
//! Frame reference views are fully consistent whenever the poll runs: the
//! loop publishes the current position first and never polls mid-
//! instruction.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

/// A pause flag shared between one interpreter thread and its pauser.
pub struct SuspendController {
    pause_pending: AtomicBool,
    paused: Mutex<bool>,
    resumed: Condvar,
    pauses_taken: AtomicUsize,
}

impl SuspendController {
    /// A controller with no pause pending.
    pub fn new() -> Self {
        SuspendController {
            pause_pending: AtomicBool::new(false),
            paused: Mutex::new(false),
            resumed: Condvar::new(),
            pauses_taken: AtomicUsize::new(0),
        }
    }

    /// The per-instruction check. Returns immediately unless a pause is
    /// pending, in which case the thread parks until [`resume`] runs.
    ///
    /// [`resume`]: SuspendController::resume
    #[inline(always)]
    pub fn poll(&self) {
        if self.pause_pending.load(Ordering::Acquire) {
            self.park();
        }
    }

    #[cold]
    #[inline(never)]
    fn park(&self) {
        let mut paused = self.paused.lock();
        if *paused {
            self.pauses_taken.fetch_add(1, Ordering::Relaxed);
        }
        while *paused {
            self.resumed.wait(&mut paused);
        }
    }

    /// Requests a pause. The polling thread parks at its next suspend
    /// point and stays parked until [`resume`].
    ///
    /// [`resume`]: SuspendController::resume
    pub fn request_pause(&self) {
        *self.paused.lock() = true;
        self.pause_pending.store(true, Ordering::Release);
    }

    /// Releases a pause and wakes the parked thread.
    pub fn resume(&self) {
        let mut paused = self.paused.lock();
        *paused = false;
        self.pause_pending.store(false, Ordering::Release);
        self.resumed.notify_all();
    }

    /// Whether a pause is currently pending.
    pub fn is_pause_pending(&self) -> bool {
        self.pause_pending.load(Ordering::Acquire)
    }

    /// Number of polls that actually parked.
    pub fn pauses_taken(&self) -> usize {
        self.pauses_taken.load(Ordering::Relaxed)
    }
}

impl Default for SuspendController {
    fn default() -> Self {
        Self::new()
    }
}
