//! Whole-file fingerprint used for the server-side existence check.
//!
//! For large files this is a sampled fingerprint, not a digest of every
//! byte: three windows (head, middle, tail) are hashed so the cost stays
//! bounded no matter how big the file is. It is a dedup lookup key only,
//! never used for chunk addressing or integrity verification.

use crate::error::UploadError;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Window size for files up to `LARGE_FILE_THRESHOLD` bytes.
const SMALL_WINDOW: u64 = 200 * 1024;
/// Window size for files above `LARGE_FILE_THRESHOLD` bytes.
const LARGE_WINDOW: u64 = 500 * 1024;
const LARGE_FILE_THRESHOLD: u64 = 2000 * 1024;

/// Computes the whole-file fingerprint for `path` under the session's
/// `chunk_size`.
///
/// Files no larger than one chunk are hashed in full (streaming). Larger
/// files hash the concatenation of three windows: the first W bytes, W
/// bytes starting at the midpoint, and the last W bytes, where W is
/// 500 KiB for files above ~2 MB and 200 KiB otherwise. Windows clamp to
/// the file end and may overlap for files not much larger than a chunk.
pub fn file_fingerprint(path: &Path, chunk_size: u64) -> Result<String, UploadError> {
    if chunk_size == 0 {
        return Err(UploadError::InvalidConfiguration(
            "chunk size must be positive".to_string(),
        ));
    }
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();

    let mut hasher = Sha256::new();
    if size <= chunk_size {
        hash_window(&mut file, &mut hasher, 0, size)?;
    } else {
        let w = if size > LARGE_FILE_THRESHOLD {
            LARGE_WINDOW
        } else {
            SMALL_WINDOW
        };
        let mid = size.div_ceil(2);
        let windows = [
            (0, w.min(size)),
            (mid, (mid + w).min(size)),
            (size.saturating_sub(w), size),
        ];
        for (start, end) in windows {
            hash_window(&mut file, &mut hasher, start, end)?;
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Streams `[start, end)` of `file` into `hasher` through a fixed buffer.
fn hash_window(
    file: &mut File,
    hasher: &mut Sha256,
    start: u64,
    end: u64,
) -> Result<(), UploadError> {
    file.seek(SeekFrom::Start(start))?;
    let mut remaining = end.saturating_sub(start);
    let mut buf = [0u8; BUF_SIZE];
    while remaining > 0 {
        let want = remaining.min(BUF_SIZE as u64) as usize;
        let n = file.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        remaining -= n as u64;
    }
    Ok(())
}
