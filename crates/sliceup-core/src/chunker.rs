//! Chunk planning and per-chunk fingerprinting.
//!
//! Splits a file into ordered, non-overlapping chunks of a configured size
//! and computes a streaming fingerprint per chunk. Chunking is fully
//! deterministic: the same file and chunk size always yield the same
//! boundaries and fingerprints.

use crate::error::UploadError;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// A single chunk: byte range [start, end) (half-open) at a stable index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Position in the session, unique and stable.
    pub index: usize,
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ChunkRange {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A planned chunk with its content fingerprint.
#[derive(Debug, Clone)]
pub struct ChunkSpec {
    pub range: ChunkRange,
    /// Lowercase hex digest of this chunk's bytes (chunk-local, not
    /// cumulative from the file start).
    pub fingerprint: String,
    /// Remote object name: `{fingerprint}_{index}`.
    pub name: String,
    /// Total number of chunks in the session (same for every chunk).
    pub total: usize,
}

/// Plans chunk ranges for `total_size` bytes: chunk `i` spans
/// `[i*chunk_size, min((i+1)*chunk_size, total_size))`. The ranges are
/// contiguous and exhaustive; only the last chunk may be shorter.
/// Returns an empty vec when `total_size` is 0.
pub fn plan_chunks(total_size: u64, chunk_size: u64) -> Result<Vec<ChunkRange>, UploadError> {
    if chunk_size == 0 {
        return Err(UploadError::InvalidConfiguration(
            "chunk size must be positive".to_string(),
        ));
    }
    if total_size == 0 {
        return Ok(Vec::new());
    }

    let count = total_size.div_ceil(chunk_size) as usize;
    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        let start = index as u64 * chunk_size;
        let end = (start + chunk_size).min(total_size);
        out.push(ChunkRange { index, start, end });
    }
    Ok(out)
}

/// Splits `path` into chunks of `chunk_size` bytes and fingerprints each
/// one with a streaming hasher over a fixed buffer, so memory stays
/// bounded regardless of file or chunk size.
pub fn chunk_file(path: &Path, chunk_size: u64) -> Result<Vec<ChunkSpec>, UploadError> {
    let mut file = File::open(path)?;
    let total_size = file.metadata()?.len();
    let ranges = plan_chunks(total_size, chunk_size)?;
    let total = ranges.len();

    let mut out = Vec::with_capacity(total);
    let mut buf = [0u8; BUF_SIZE];
    for range in ranges {
        file.seek(SeekFrom::Start(range.start))?;
        // One hasher per chunk: fingerprints identify the chunk's own
        // bytes, not everything from the file start through its end.
        let mut hasher = Sha256::new();
        let mut remaining = range.len();
        while remaining > 0 {
            let want = remaining.min(BUF_SIZE as u64) as usize;
            let n = file.read(&mut buf[..want])?;
            if n == 0 {
                return Err(UploadError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("file truncated while reading chunk {}", range.index),
                )));
            }
            hasher.update(&buf[..n]);
            remaining -= n as u64;
        }
        let fingerprint = hex::encode(hasher.finalize());
        let name = format!("{}_{}", fingerprint, range.index);
        out.push(ChunkSpec {
            range,
            fingerprint,
            name,
            total,
        });
    }
    Ok(out)
}

/// Reads one chunk's bytes from `path` (the upload body for that chunk).
pub fn read_chunk(path: &Path, range: &ChunkRange) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(range.start))?;
    let mut out = vec![0u8; range.len() as usize];
    file.read_exact(&mut out)?;
    Ok(out)
}
