// Host audio callback control
//
// The owning mixer renders audio from a realtime callback on its own thread.
// Sequencer reconfiguration must not be observed half-applied by that
// callback, so the bridge suspends it around every mutation.

pub mod cpal_host;
pub mod gate;

pub use cpal_host::CpalHost;
pub use gate::CallbackGate;

/// Suspend/lock contract of the host audio-output callback
pub trait AudioCallbackControl {
    /// Pause or resume callback invocation
    fn pause(&self, paused: bool);

    /// Wait for an in-flight callback to finish and keep it out
    fn lock(&self);

    /// Release a lock held by the caller; returns false if none was held
    fn unlock(&self) -> bool;
}

impl<T: AudioCallbackControl + ?Sized> AudioCallbackControl for &T {
    fn pause(&self, paused: bool) {
        (**self).pause(paused)
    }

    fn lock(&self) {
        (**self).lock()
    }

    fn unlock(&self) -> bool {
        (**self).unlock()
    }
}

/// Host without an audio callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHostAudio;

impl AudioCallbackControl for NoHostAudio {
    fn pause(&self, _paused: bool) {}

    fn lock(&self) {}

    fn unlock(&self) -> bool {
        false
    }
}

/// Keeps the host callback paused while alive
///
/// Entry pauses the callback and releases the caller's lock on it; drop
/// re-acquires the lock (only if one was released) and resumes, on every exit
/// path including unwinding.
#[must_use = "the callback resumes as soon as the guard is dropped"]
pub struct CallbackSuspension<'a, H: AudioCallbackControl + ?Sized> {
    host: &'a H,
    relock: bool,
}

impl<'a, H: AudioCallbackControl + ?Sized> CallbackSuspension<'a, H> {
    pub fn new(host: &'a H) -> Self {
        host.pause(true);
        let relock = host.unlock();
        Self { host, relock }
    }
}

impl<H: AudioCallbackControl + ?Sized> Drop for CallbackSuspension<'_, H> {
    fn drop(&mut self) {
        if self.relock {
            self.host.lock();
        }
        self.host.pause(false);
    }
}
