//! Session control: pause/cancel flags and the in-flight handle registry.
//!
//! Each in-flight chunk request registers an abort token; `pause()` and
//! `cancel()` trip every registered token and clear the registry. The
//! transport polls the token (together with the session flags) at its
//! readiness ticks, so cancellation is cooperative, never preemptive.

use crate::transport::AbortHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Pause/cancel flags for one session.
#[derive(Debug, Default)]
pub(super) struct ControlFlags {
    paused: AtomicBool,
    cancelled: AtomicBool,
}

impl ControlFlags {
    pub(super) fn set_paused(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub(super) fn set_cancelled(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub(super) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub(super) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// True when no new work should start and in-flight work should
    /// abort at its next checkpoint.
    pub(super) fn should_stop(&self) -> bool {
        self.is_paused() || self.is_cancelled()
    }

    /// Clears both flags; the resume path calls this before restarting.
    pub(super) fn clear(&self) {
        self.paused.store(false, Ordering::Relaxed);
        self.cancelled.store(false, Ordering::Relaxed);
    }
}

/// Registry of chunk index -> abort token for requests currently in
/// flight. Absent entry means no request is in flight for that chunk.
#[derive(Debug, Default)]
pub(super) struct ActiveHandles {
    handles: Mutex<HashMap<usize, AbortHandle>>,
}

impl ActiveHandles {
    pub(super) fn register(&self, index: usize, handle: AbortHandle) {
        self.handles.lock().unwrap().insert(index, handle);
    }

    pub(super) fn unregister(&self, index: usize) {
        self.handles.lock().unwrap().remove(&index);
    }

    /// Trips every tracked token, then clears the registry.
    pub(super) fn abort_all(&self) {
        let mut handles = self.handles.lock().unwrap();
        for handle in handles.values() {
            handle.abort();
        }
        handles.clear();
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.handles.lock().unwrap().len()
    }
}
