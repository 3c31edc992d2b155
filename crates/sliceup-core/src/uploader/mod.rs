//! Upload orchestrator: the resumable chunked-upload state machine.
//!
//! One [`SliceUploader`] owns one upload session for one file. `start()`
//! fingerprints the file, consults the verify endpoint (dedup fast-path),
//! chunks the file on first run, and drives one transport request per
//! non-successful chunk through the bounded pool. `pause()`/`cancel()`
//! trip the control flags and abort in-flight requests at their next
//! transport tick; `resume()` clears the flags and calls `start()` again,
//! reusing the cached fingerprint and chunk states so only ready/error
//! chunks are resubmitted.
//!
//! Control-plane calls (`start`, `pause`, `cancel`, `resume`) must be
//! serialized per session: run one `start()` at a time.

mod control;
mod run;
mod session;
mod state;

pub use state::{ChunkState, ChunkStatus, SessionStatus};

use crate::error::UploadError;
use crate::events::{Emitter, Subscription, UploadEvent};
use crate::remote::RemoteStore;
use crate::transport::{ChunkPayload, ChunkTransport, TransportRequest};
use session::SessionInner;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

/// Default chunk size: 2 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;
/// Default maximum number of chunk uploads in flight.
pub const DEFAULT_POOL_LIMIT: usize = 4;

/// One upload session for one file.
pub struct SliceUploader {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SliceUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceUploader")
            .field("file_path", &self.inner.file_path)
            .field("chunk_size", &self.inner.chunk_size)
            .field("pool_limit", &self.inner.pool_limit)
            .finish_non_exhaustive()
    }
}

impl SliceUploader {
    pub fn builder() -> SliceUploaderBuilder {
        SliceUploaderBuilder::new()
    }

    /// Runs the session: verify, chunk, upload, merge. Re-invoke after a
    /// pause or partial failure to resume; already-successful chunks are
    /// not resubmitted. Returns the derived session status on completion.
    pub async fn start(&self) -> Result<SessionStatus, UploadError> {
        run::start_session(&self.inner).await
    }

    /// Sets the paused flag, aborts every in-flight request, and emits
    /// `Pause`. In-flight requests settle at their next transport tick.
    pub fn pause(&self) {
        tracing::info!(file = %self.inner.file_path.display(), "pause requested");
        self.inner.flags.set_paused();
        self.inner.active.abort_all();
        self.inner.events.emit(&UploadEvent::Pause);
    }

    /// Sets the cancelled flag, aborts every in-flight request, and
    /// emits `Cancel`.
    pub fn cancel(&self) {
        tracing::info!(file = %self.inner.file_path.display(), "cancel requested");
        self.inner.flags.set_cancelled();
        self.inner.active.abort_all();
        self.inner.events.emit(&UploadEvent::Cancel);
    }

    /// Clears the pause/cancel flags and calls `start()` again.
    pub async fn resume(&self) -> Result<SessionStatus, UploadError> {
        self.inner.flags.clear();
        self.start().await
    }

    /// Subscribes to session events; see [`UploadEvent`].
    pub fn on(&self, callback: impl Fn(&UploadEvent) + Send + Sync + 'static) -> Subscription {
        self.inner.events.on(callback)
    }

    /// Removes a subscription added with [`Self::on`].
    pub fn off(&self, subscription: Subscription) {
        self.inner.events.off(subscription)
    }

    /// Derived session status (never stored).
    pub fn status(&self) -> SessionStatus {
        self.inner.status()
    }

    /// Aggregate progress: mean of per-chunk progress, 0..=100.
    pub fn progress(&self) -> u8 {
        self.inner.progress()
    }

    /// Snapshot of the current chunk states (empty before the first
    /// `start()`).
    pub fn chunks(&self) -> Vec<ChunkState> {
        self.inner.chunks.lock().unwrap().clone()
    }

    pub fn filename(&self) -> String {
        self.inner.filename.clone()
    }
}

/// Configures and validates a [`SliceUploader`].
///
/// The file, transport, remote store, and request builder are required;
/// everything else has defaults. Validation failures surface before any
/// I/O, as descriptive [`UploadError`]s.
#[derive(Default)]
pub struct SliceUploaderBuilder {
    file: Option<PathBuf>,
    filename: Option<String>,
    chunk_size: Option<u64>,
    pool_limit: Option<usize>,
    transport: Option<Arc<dyn ChunkTransport>>,
    remote: Option<Arc<dyn RemoteStore>>,
    build_request: Option<Box<dyn Fn(&ChunkPayload) -> TransportRequest + Send + Sync>>,
}

impl SliceUploaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The file to upload.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Remote filename; defaults to the file's basename.
    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    pub fn chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = Some(bytes);
        self
    }

    /// Maximum concurrent chunk uploads.
    pub fn pool_limit(mut self, limit: usize) -> Self {
        self.pool_limit = Some(limit);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn ChunkTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Pure mapping from a chunk to the request that uploads it. The
    /// orchestrator attaches its own progress/abort hooks separately.
    pub fn request_builder(
        mut self,
        build: impl Fn(&ChunkPayload) -> TransportRequest + Send + Sync + 'static,
    ) -> Self {
        self.build_request = Some(Box::new(build));
        self
    }

    pub fn build(self) -> Result<SliceUploader, UploadError> {
        let file_path = self
            .file
            .ok_or_else(|| UploadError::Validation("no file configured".to_string()))?;
        let build_request = self.build_request.ok_or_else(|| {
            UploadError::Validation("no upload request builder configured".to_string())
        })?;
        let transport = self
            .transport
            .ok_or_else(|| UploadError::Validation("no transport configured".to_string()))?;
        let remote = self
            .remote
            .ok_or_else(|| UploadError::Validation("no remote store configured".to_string()))?;

        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(UploadError::InvalidConfiguration(
                "chunk size must be positive".to_string(),
            ));
        }
        let pool_limit = self.pool_limit.unwrap_or(DEFAULT_POOL_LIMIT);
        if pool_limit == 0 {
            return Err(UploadError::InvalidConfiguration(
                "pool limit must be positive".to_string(),
            ));
        }

        let filename = match self.filename {
            Some(name) => name,
            None => file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    UploadError::Validation(format!(
                        "cannot derive filename from {}",
                        file_path.display()
                    ))
                })?,
        };

        Ok(SliceUploader {
            inner: Arc::new(SessionInner {
                file_path,
                filename,
                chunk_size,
                pool_limit,
                build_request,
                transport,
                remote,
                fingerprint: Mutex::new(None),
                chunks: Mutex::new(Vec::new()),
                flags: Default::default(),
                active: Default::default(),
                merge_fired: AtomicBool::new(false),
                events: Emitter::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MergeRequest, VerifyRequest};
    use crate::transport::{TransportHooks, TransportOutcome};
    use async_trait::async_trait;

    struct NullTransport;

    #[async_trait]
    impl ChunkTransport for NullTransport {
        async fn send(&self, _: TransportRequest, _: TransportHooks) -> TransportOutcome {
            TransportOutcome::Success(Vec::new())
        }
    }

    struct NullRemote;

    #[async_trait]
    impl RemoteStore for NullRemote {
        async fn exists(&self, _: &VerifyRequest) -> Result<bool, UploadError> {
            Ok(false)
        }

        async fn merge(&self, _: &MergeRequest) -> Result<(), UploadError> {
            Ok(())
        }
    }

    fn noop_builder(_: &ChunkPayload) -> TransportRequest {
        TransportRequest {
            url: "http://localhost/upload".to_string(),
            method: "POST".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[test]
    fn build_requires_file() {
        let err = SliceUploader::builder()
            .transport(Arc::new(NullTransport))
            .remote(Arc::new(NullRemote))
            .request_builder(noop_builder)
            .build()
            .unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
    }

    #[test]
    fn build_requires_request_builder() {
        let err = SliceUploader::builder()
            .file("/tmp/some-file")
            .transport(Arc::new(NullTransport))
            .remote(Arc::new(NullRemote))
            .build()
            .unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
    }

    #[test]
    fn build_rejects_zero_chunk_size() {
        let err = SliceUploader::builder()
            .file("/tmp/some-file")
            .chunk_size(0)
            .transport(Arc::new(NullTransport))
            .remote(Arc::new(NullRemote))
            .request_builder(noop_builder)
            .build()
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidConfiguration(_)));
    }

    #[test]
    fn build_defaults_filename_to_basename() {
        let uploader = SliceUploader::builder()
            .file("/tmp/dir/archive.tar")
            .transport(Arc::new(NullTransport))
            .remote(Arc::new(NullRemote))
            .request_builder(noop_builder)
            .build()
            .unwrap();
        assert_eq!(uploader.filename(), "archive.tar");
        assert_eq!(uploader.status(), SessionStatus::Ready);
        assert_eq!(uploader.progress(), 0);
        assert!(uploader.chunks().is_empty());
    }

    #[tokio::test]
    async fn start_fails_fast_on_missing_file() {
        let uploader = SliceUploader::builder()
            .file("/nonexistent/definitely-not-here.bin")
            .transport(Arc::new(NullTransport))
            .remote(Arc::new(NullRemote))
            .request_builder(noop_builder)
            .build()
            .unwrap();
        let err = uploader.start().await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
    }

    #[tokio::test]
    async fn start_fails_fast_on_empty_file() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let uploader = SliceUploader::builder()
            .file(f.path())
            .transport(Arc::new(NullTransport))
            .remote(Arc::new(NullRemote))
            .request_builder(noop_builder)
            .build()
            .unwrap();
        let err = uploader.start().await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
    }
}
