//! Owned session state and its single-writer mutators.
//!
//! All chunk mutation funnels through these methods; transport callbacks
//! and pool tasks hold an `Arc<SessionInner>` plus their chunk's index and
//! never touch the vector directly. Locks are released before events are
//! emitted so subscribers can call back into the session.

use crate::error::UploadError;
use crate::events::{Emitter, UploadEvent};
use crate::remote::RemoteStore;
use crate::transport::{ChunkTransport, RequestBuilder};
use crate::uploader::control::{ActiveHandles, ControlFlags};
use crate::uploader::state::{
    aggregate_progress, derived_status, ChunkState, ChunkStatus, SessionStatus,
};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

pub(super) struct SessionInner {
    pub(super) file_path: PathBuf,
    pub(super) filename: String,
    pub(super) chunk_size: u64,
    pub(super) pool_limit: usize,
    pub(super) build_request: Box<RequestBuilder>,
    pub(super) transport: Arc<dyn ChunkTransport>,
    pub(super) remote: Arc<dyn RemoteStore>,
    /// Whole-file fingerprint, computed at most once per session.
    pub(super) fingerprint: Mutex<Option<String>>,
    /// Empty until the first `start()`; reused unchanged across
    /// pause/resume cycles.
    pub(super) chunks: Mutex<Vec<ChunkState>>,
    pub(super) flags: ControlFlags,
    pub(super) active: ActiveHandles,
    /// Latch guaranteeing the merge call fires at most once per session.
    pub(super) merge_fired: AtomicBool,
    pub(super) events: Emitter,
}

impl SessionInner {
    pub(super) fn status(&self) -> SessionStatus {
        derived_status(&self.chunks.lock().unwrap())
    }

    pub(super) fn progress(&self) -> u8 {
        aggregate_progress(&self.chunks.lock().unwrap())
    }

    pub(super) fn emit_error(&self, message: &str) {
        self.events.emit(&UploadEvent::Error {
            message: message.to_string(),
        });
    }

    pub(super) fn mark_uploading(&self, index: usize) {
        let mut chunks = self.chunks.lock().unwrap();
        chunks[index].status = ChunkStatus::Uploading;
    }

    /// Updates one chunk's progress and re-emits the aggregate. Ignored
    /// unless the chunk is uploading; progress never decreases.
    pub(super) fn chunk_progress(&self, index: usize, percent: u8) {
        let aggregate = {
            let mut chunks = self.chunks.lock().unwrap();
            let chunk = &mut chunks[index];
            if chunk.status != ChunkStatus::Uploading {
                return;
            }
            chunk.progress = chunk.progress.max(percent.min(100));
            aggregate_progress(&chunks)
        };
        self.events.emit(&UploadEvent::Progress { percent: aggregate });
    }

    /// Marks one chunk successful and emits the new aggregate. Returns
    /// true exactly once per session: when this completion made every
    /// chunk successful and this caller won the merge latch.
    pub(super) fn complete_chunk(&self, index: usize) -> bool {
        let (aggregate, all_success) = {
            let mut chunks = self.chunks.lock().unwrap();
            chunks[index].status = ChunkStatus::Success;
            chunks[index].progress = 100;
            (
                aggregate_progress(&chunks),
                chunks.iter().all(|c| c.status == ChunkStatus::Success),
            )
        };
        self.events.emit(&UploadEvent::Progress { percent: aggregate });
        all_success
            && !self
                .merge_fired
                .swap(true, std::sync::atomic::Ordering::SeqCst)
    }

    /// Reverts an aborted chunk to ready, preserving its last observed
    /// progress, and signals the error channel with the abort cause.
    pub(super) fn mark_aborted(&self, index: usize) {
        {
            let mut chunks = self.chunks.lock().unwrap();
            let chunk = &mut chunks[index];
            if chunk.status == ChunkStatus::Uploading {
                chunk.status = ChunkStatus::Ready;
            }
        }
        tracing::debug!(chunk = index, "chunk aborted, reverted to ready");
        self.emit_error(&UploadError::Aborted { index }.to_string());
    }

    /// Marks one chunk failed and emits the cause. Siblings are
    /// untouched.
    pub(super) fn mark_error(&self, index: usize, message: &str) {
        {
            let mut chunks = self.chunks.lock().unwrap();
            chunks[index].status = ChunkStatus::Error;
        }
        tracing::warn!(chunk = index, error = message, "chunk upload failed");
        self.emit_error(
            &UploadError::ChunkTransport {
                index,
                message: message.to_string(),
            }
            .to_string(),
        );
    }
}
