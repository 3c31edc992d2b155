//! Transport seam: one HTTP-like request per chunk.
//!
//! The orchestrator never talks to the network directly; it hands a
//! [`TransportRequest`] plus its own hooks to a [`ChunkTransport`], which
//! settles with exactly one terminal [`TransportOutcome`]. The production
//! implementation is [`curl::CurlTransport`]; tests supply their own.

pub mod curl;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Request description produced by the caller-supplied builder, possibly
/// augmented by the orchestrator (a new value is constructed; the
/// builder's output is never mutated in place).
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    /// HTTP method, e.g. "POST".
    pub method: String,
    /// Extra headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
    /// Raw request body (the chunk's bytes plus whatever framing the
    /// builder chose).
    pub body: Vec<u8>,
}

/// Input to the caller-supplied request builder: everything the server
/// needs to store and later reassemble one chunk.
#[derive(Debug, Clone)]
pub struct ChunkPayload {
    /// The chunk's raw bytes.
    pub bytes: Vec<u8>,
    /// Position of the chunk in the session.
    pub index: usize,
    /// Chunk content fingerprint (hex).
    pub fingerprint: String,
    /// Remote object name (`{fingerprint}_{index}`).
    pub name: String,
    /// Total number of chunks in the session.
    pub total: usize,
}

/// Maps a chunk to the request that uploads it. Must be pure: no side
/// effects, no captured mutable state.
pub type RequestBuilder = dyn Fn(&ChunkPayload) -> TransportRequest + Send + Sync;

/// Abort token for one in-flight request. May be tripped at any time;
/// tripping after the request has settled is a no-op.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Orchestrator-owned hooks attached to every chunk request.
pub struct TransportHooks {
    /// Called zero or more times with percent done (0..=100) before the
    /// request settles.
    pub on_progress: Box<dyn Fn(u8) + Send + Sync>,
    /// Polled at every transport readiness tick; returning true aborts
    /// the request at that tick. This is the sole cancellation
    /// checkpoint, so cancellation latency is bounded by the transport's
    /// own tick granularity.
    pub should_abort: Box<dyn Fn() -> bool + Send + Sync>,
}

/// Terminal settlement of one request: exactly one per `send` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// 2xx response; carries the response body.
    Success(Vec<u8>),
    /// Network failure or non-2xx status.
    Error(String),
    /// The per-tick abort check fired before completion.
    Aborted,
}

/// Performs one request and reports byte-level progress through the
/// hooks. Implementations must call `should_abort` at each readiness
/// tick and settle with `Aborted` when it returns true.
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    async fn send(&self, request: TransportRequest, hooks: TransportHooks) -> TransportOutcome;
}
