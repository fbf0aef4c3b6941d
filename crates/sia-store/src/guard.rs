//! Non-reentrant update guard

use parking_lot::ReentrantMutex;
use std::cell::Cell;

/// Busy flag that rejects nested runs on the same thread
///
/// A run started from inside another run on the same thread (a listener
/// triggering a write) is skipped, not queued. A run from another thread
/// waits until the active one finishes.
#[derive(Debug, Default)]
pub struct UpdateGuard {
    state: ReentrantMutex<Cell<bool>>,
}

impl UpdateGuard {
    /// Create idle guard
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a run is active on any thread
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.try_lock().map_or(true, |busy| busy.get())
    }

    /// Run `f` unless this thread is already inside a run
    ///
    /// Returns `None` without calling `f` on re-entry. The flag is cleared
    /// on every exit path, unwinding included.
    pub fn run_exclusive<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let state = self.state.lock();
        if state.get() {
            return None;
        }
        state.set(true);
        let _reset = BusyReset(&state);
        Some(f())
    }
}

struct BusyReset<'a>(&'a Cell<bool>);

impl Drop for BusyReset<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
