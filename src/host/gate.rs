// Callback gate - lock-free pause/lock shared with the realtime callback
//
// The callback never blocks: it marks itself in flight, then renders only if
// the gate is neither paused nor locked. `lock()` is the side that waits, for
// at most one in-flight callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;

use super::AudioCallbackControl;

#[derive(Debug, Default)]
struct GateState {
    paused: AtomicBool,
    locks: AtomicU32,
    in_callback: AtomicBool,
}

#[derive(Clone, Debug, Default)]
pub struct CallbackGate {
    inner: Arc<GateState>,
}

impl CallbackGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `render` from the realtime callback unless the gate is closed
    ///
    /// Returns false when the callback was kept out; the caller then outputs
    /// silence.
    pub fn enter<F: FnOnce()>(&self, render: F) -> bool {
        let state = &self.inner;
        state.in_callback.store(true, Ordering::SeqCst);

        let open =
            !state.paused.load(Ordering::SeqCst) && state.locks.load(Ordering::SeqCst) == 0;
        if open {
            render();
        }

        state.in_callback.store(false, Ordering::SeqCst);
        open
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    pub fn is_locked(&self) -> bool {
        self.inner.locks.load(Ordering::SeqCst) > 0
    }
}

impl AudioCallbackControl for CallbackGate {
    fn pause(&self, paused: bool) {
        self.inner.paused.store(paused, Ordering::SeqCst);
    }

    fn lock(&self) {
        self.inner.locks.fetch_add(1, Ordering::SeqCst);
        while self.inner.in_callback.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    }

    fn unlock(&self) -> bool {
        self.inner
            .locks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |locks| {
                locks.checked_sub(1)
            })
            .is_ok()
    }
}
