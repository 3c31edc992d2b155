//! Per-chunk state and the derived session-level status.

use crate::chunker::ChunkSpec;

/// Lifecycle of one chunk within a session.
///
/// `Ready -> Uploading -> {Success, Error}`, plus `Uploading -> Ready`
/// when the request is aborted before completion. `Success` is terminal
/// for the session; `Ready` and `Error` chunks are resubmitted on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Ready,
    Uploading,
    Success,
    Error,
}

/// One chunk plus its upload state.
#[derive(Debug, Clone)]
pub struct ChunkState {
    pub spec: ChunkSpec,
    pub status: ChunkStatus,
    /// Percent done (0..=100). Non-decreasing while uploading, frozen
    /// otherwise; deliberately not reset when the chunk reverts to
    /// ready, so resumed sessions keep their last observed value.
    pub progress: u8,
}

impl ChunkState {
    pub fn new(spec: ChunkSpec) -> Self {
        Self {
            spec,
            status: ChunkStatus::Ready,
            progress: 0,
        }
    }
}

/// Session-level status. Always derived from chunk states, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Ready,
    Uploading,
    Success,
    Error,
}

/// Derives the session status. Precedence: any chunk uploading, else all
/// chunks success, else any chunk error, else ready. An empty chunk list
/// (nothing materialized yet) is ready.
pub fn derived_status(chunks: &[ChunkState]) -> SessionStatus {
    if chunks.is_empty() {
        return SessionStatus::Ready;
    }
    if chunks.iter().any(|c| c.status == ChunkStatus::Uploading) {
        return SessionStatus::Uploading;
    }
    if chunks.iter().all(|c| c.status == ChunkStatus::Success) {
        return SessionStatus::Success;
    }
    if chunks.iter().any(|c| c.status == ChunkStatus::Error) {
        return SessionStatus::Error;
    }
    SessionStatus::Ready
}

/// Aggregate progress: floor of the arithmetic mean of per-chunk
/// progress, 0 when no chunks exist yet.
pub fn aggregate_progress(chunks: &[ChunkState]) -> u8 {
    if chunks.is_empty() {
        return 0;
    }
    let sum: u64 = chunks.iter().map(|c| c.progress as u64).sum();
    (sum / chunks.len() as u64) as u8
}
