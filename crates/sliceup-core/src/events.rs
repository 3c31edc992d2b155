//! Upload event channel: subscriber registry with synchronous emission.
//!
//! Observers subscribe to session events and may unsubscribe at any time;
//! events are delivered in the order the uploader triggers them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Events emitted by an upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Preconditions passed and the session began work.
    Start,
    /// Aggregate progress changed (mean of per-chunk progress, 0..=100).
    Progress { percent: u8 },
    /// A chunk failed, was aborted, or a fingerprint/verify/merge call
    /// failed. Carries a human-readable cause.
    Error { message: String },
    /// `pause()` was invoked.
    Pause,
    /// `cancel()` was invoked.
    Cancel,
}

/// Handle returned by [`Emitter::on`]; pass it to [`Emitter::off`] to
/// unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Callback = Arc<dyn Fn(&UploadEvent) + Send + Sync>;

/// Subscriber registry. Emission is synchronous, in subscription order.
/// Callbacks may themselves subscribe or unsubscribe (the registry is
/// snapshotted before delivery, so no lock is held during callbacks).
#[derive(Default)]
pub struct Emitter {
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for every subsequent event.
    pub fn on(&self, callback: impl Fn(&UploadEvent) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap()
            .push((id, Arc::new(callback)));
        Subscription(id)
    }

    /// Removes a previously registered callback. Unknown ids are ignored.
    pub fn off(&self, subscription: Subscription) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|(id, _)| *id != subscription.0);
    }

    /// Delivers `event` to all current subscribers, in subscription order.
    pub fn emit(&self, event: &UploadEvent) {
        let snapshot: Vec<Callback> = self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in snapshot {
            cb(event);
        }
    }
}
