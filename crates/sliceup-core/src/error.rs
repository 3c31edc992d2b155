//! Error types for the upload core.
//!
//! `UploadError` is the typed library seam; callers that do not care about
//! the variant can bubble it through `anyhow` at the application edge.

use thiserror::Error;

/// Errors surfaced by the chunker, fingerprinter, and uploader.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Session configuration is unusable (e.g. zero chunk size).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Precondition failed before any network activity (missing file,
    /// empty file, missing request builder).
    #[error("validation failed: {0}")]
    Validation(String),

    /// File I/O failed while chunking, fingerprinting, or reading a
    /// chunk body.
    #[error("file I/O: {0}")]
    Io(#[from] std::io::Error),

    /// A verify or merge call to the remote store failed.
    #[error("remote call failed: {0}")]
    Remote(String),

    /// One chunk's transport call failed. Isolated to that chunk;
    /// siblings are unaffected.
    #[error("chunk {index} transport failed: {message}")]
    ChunkTransport { index: usize, message: String },

    /// A chunk upload was aborted by pause/cancel. Not a hard failure;
    /// the chunk reverts to ready for a later resume.
    #[error("chunk {index} aborted by pause/cancel")]
    Aborted { index: usize },

    /// Runtime-level failure (e.g. a worker task panicked).
    #[error("internal: {0}")]
    Internal(String),
}
