//! The `start()` pipeline: validate, fingerprint, verify, chunk, upload,
//! merge.

use crate::chunker;
use crate::error::UploadError;
use crate::events::UploadEvent;
use crate::fingerprint;
use crate::pool;
use crate::remote::{MergeRequest, VerifyRequest};
use crate::transport::{AbortHandle, ChunkPayload, TransportHooks, TransportOutcome};
use crate::uploader::session::SessionInner;
use crate::uploader::state::{ChunkState, ChunkStatus, SessionStatus};
use std::sync::Arc;

/// Why one chunk task settled unsuccessfully. Reported through the pool's
/// failure callback; the chunk's own state was already updated.
pub(super) struct ChunkFailure {
    pub(super) index: usize,
    pub(super) aborted: bool,
    pub(super) message: String,
}

/// Runs one `start()` invocation end to end. Safe to call again after a
/// pause or a partial failure: the cached fingerprint and chunk list are
/// reused and already-successful chunks are skipped.
pub(super) async fn start_session(inner: &Arc<SessionInner>) -> Result<SessionStatus, UploadError> {
    check_preconditions(inner)?;
    inner.events.emit(&UploadEvent::Start);
    tracing::info!(file = %inner.file_path.display(), "starting upload session");

    let fingerprint = ensure_fingerprint(inner).await?;

    let verify = VerifyRequest {
        filename: inner.filename.clone(),
        file_fingerprint: fingerprint.clone(),
    };
    let exists = match inner.remote.exists(&verify).await {
        Ok(exists) => exists,
        Err(e) => {
            inner.emit_error(&e.to_string());
            return Err(e);
        }
    };
    if exists {
        tracing::info!(filename = %inner.filename, "server already has this file, skipping upload");
        inner.events.emit(&UploadEvent::Progress { percent: 100 });
        return Ok(SessionStatus::Success);
    }

    ensure_chunks(inner).await?;

    // On resume, chunks that already succeeded get no new task.
    let pending: Vec<usize> = inner
        .chunks
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.status != ChunkStatus::Success)
        .map(|c| c.spec.range.index)
        .collect();
    tracing::debug!(
        pending = pending.len(),
        pool_limit = inner.pool_limit,
        "submitting chunk uploads"
    );

    let mut constructors = Vec::with_capacity(pending.len());
    for index in pending {
        let inner = Arc::clone(inner);
        constructors.push(move || upload_one_chunk(inner, index));
    }

    let launch_gate = Arc::clone(inner);
    pool::run_bounded(
        constructors,
        inner.pool_limit,
        move || !launch_gate.flags.should_stop(),
        |index| tracing::debug!(chunk = index, "chunk task settled ok"),
        |failure: ChunkFailure| {
            tracing::debug!(
                chunk = failure.index,
                aborted = failure.aborted,
                error = %failure.message,
                "chunk task settled with failure"
            )
        },
    )
    .await
    .map_err(|e| UploadError::Internal(e.to_string()))?;

    Ok(inner.status())
}

fn check_preconditions(inner: &SessionInner) -> Result<(), UploadError> {
    let meta = std::fs::metadata(&inner.file_path).map_err(|e| {
        UploadError::Validation(format!(
            "cannot stat {}: {}",
            inner.file_path.display(),
            e
        ))
    })?;
    if !meta.is_file() {
        return Err(UploadError::Validation(format!(
            "{} is not a regular file",
            inner.file_path.display()
        )));
    }
    if meta.len() == 0 {
        return Err(UploadError::Validation(format!(
            "{} is empty",
            inner.file_path.display()
        )));
    }
    Ok(())
}

/// Returns the cached whole-file fingerprint, computing it on first use.
/// Never recomputed across pause/resume.
async fn ensure_fingerprint(inner: &Arc<SessionInner>) -> Result<String, UploadError> {
    if let Some(fp) = inner.fingerprint.lock().unwrap().clone() {
        return Ok(fp);
    }
    let path = inner.file_path.clone();
    let chunk_size = inner.chunk_size;
    let result = tokio::task::spawn_blocking(move || fingerprint::file_fingerprint(&path, chunk_size))
        .await
        .map_err(|e| UploadError::Internal(format!("fingerprint task join: {}", e)))?;
    let fp = match result {
        Ok(fp) => fp,
        Err(e) => {
            inner.emit_error(&e.to_string());
            return Err(e);
        }
    };
    tracing::debug!(fingerprint = %fp, "file fingerprint computed");
    *inner.fingerprint.lock().unwrap() = Some(fp.clone());
    Ok(fp)
}

/// Materializes the chunk list on the first run; resumed sessions keep
/// the list (and per-chunk statuses) they already have.
async fn ensure_chunks(inner: &Arc<SessionInner>) -> Result<(), UploadError> {
    if !inner.chunks.lock().unwrap().is_empty() {
        return Ok(());
    }
    let path = inner.file_path.clone();
    let chunk_size = inner.chunk_size;
    let specs = tokio::task::spawn_blocking(move || chunker::chunk_file(&path, chunk_size))
        .await
        .map_err(|e| UploadError::Internal(format!("chunker task join: {}", e)))?;
    let specs = match specs {
        Ok(specs) => specs,
        Err(e) => {
            inner.emit_error(&e.to_string());
            return Err(e);
        }
    };
    tracing::info!(chunks = specs.len(), chunk_size, "file chunked");
    *inner.chunks.lock().unwrap() = specs.into_iter().map(ChunkState::new).collect();
    Ok(())
}

/// One pool task: read the chunk, send it, apply the outcome to session
/// state, and fire the merge when this completion finished the session.
async fn upload_one_chunk(inner: Arc<SessionInner>, index: usize) -> Result<usize, ChunkFailure> {
    let (range, chunk_fingerprint, name, total) = {
        let chunks = inner.chunks.lock().unwrap();
        let spec = &chunks[index].spec;
        (
            spec.range,
            spec.fingerprint.clone(),
            spec.name.clone(),
            spec.total,
        )
    };

    let path = inner.file_path.clone();
    let bytes = match tokio::task::spawn_blocking(move || chunker::read_chunk(&path, &range)).await
    {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            let message = format!("read chunk: {}", e);
            inner.mark_error(index, &message);
            return Err(ChunkFailure {
                index,
                aborted: false,
                message,
            });
        }
        Err(e) => {
            let message = format!("read task join: {}", e);
            inner.mark_error(index, &message);
            return Err(ChunkFailure {
                index,
                aborted: false,
                message,
            });
        }
    };

    let payload = ChunkPayload {
        bytes,
        index,
        fingerprint: chunk_fingerprint,
        name,
        total,
    };
    let request = (inner.build_request)(&payload);

    inner.mark_uploading(index);
    let handle = AbortHandle::new();
    inner.active.register(index, handle.clone());

    let hooks = TransportHooks {
        on_progress: {
            let session = Arc::clone(&inner);
            Box::new(move |percent| session.chunk_progress(index, percent))
        },
        should_abort: {
            let session = Arc::clone(&inner);
            let handle = handle.clone();
            Box::new(move || session.flags.should_stop() || handle.is_aborted())
        },
    };

    let outcome = inner.transport.send(request, hooks).await;
    inner.active.unregister(index);

    match outcome {
        TransportOutcome::Success(_) => {
            tracing::debug!(chunk = index, "chunk uploaded");
            if inner.complete_chunk(index) {
                fire_merge(&inner).await;
            }
            Ok(index)
        }
        TransportOutcome::Aborted => {
            inner.mark_aborted(index);
            Err(ChunkFailure {
                index,
                aborted: true,
                message: "aborted by pause/cancel".to_string(),
            })
        }
        TransportOutcome::Error(message) => {
            inner.mark_error(index, &message);
            Err(ChunkFailure {
                index,
                aborted: false,
                message,
            })
        }
    }
}

/// Issues the merge call. Reached at most once per session (the caller
/// holds the latch); failures are surfaced on the error channel and the
/// latch stays taken, per the at-most-once contract.
async fn fire_merge(inner: &Arc<SessionInner>) {
    let fingerprint = inner
        .fingerprint
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_default();
    let request = MergeRequest {
        file_fingerprint: fingerprint,
        filename: inner.filename.clone(),
        chunk_size: inner.chunk_size,
    };
    tracing::info!(filename = %inner.filename, "all chunks uploaded, requesting merge");
    if let Err(e) = inner.remote.merge(&request).await {
        tracing::error!(error = %e, "merge call failed");
        inner.emit_error(&format!("merge failed: {}", e));
    }
}
