//! Verify/merge endpoints: the dedup fast-path gate and the server-side
//! finalize call.
//!
//! The orchestrator only sees the [`RemoteStore`] trait; the production
//! implementation is [`http::HttpRemote`], tests supply their own.

pub mod http;

use crate::error::UploadError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request body for the existence check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub filename: String,
    pub file_fingerprint: String,
}

/// Response body of the existence check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub exists: bool,
}

/// Request body for the merge (finalize) call. The server uses the
/// fingerprint and chunk size to locate and reassemble the chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
    pub file_fingerprint: String,
    pub filename: String,
    pub chunk_size: u64,
}

/// Server endpoints consulted by the orchestrator: existence check
/// before any chunk work, merge exactly once after all chunks succeed.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns true if the server already holds a file with this
    /// fingerprint (dedup fast-path).
    async fn exists(&self, request: &VerifyRequest) -> Result<bool, UploadError>;

    /// Asks the server to assemble the uploaded chunks into the final
    /// file. Invoked at most once per session.
    async fn merge(&self, request: &MergeRequest) -> Result<(), UploadError>;
}
