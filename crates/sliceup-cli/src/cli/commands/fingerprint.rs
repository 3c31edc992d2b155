//! `sliceup fingerprint <file>` – print the sampled whole-file
//! fingerprint (the dedup lookup key, not an integrity checksum).

use anyhow::Result;
use sliceup_core::config::SliceupConfig;
use sliceup_core::fingerprint;
use std::path::Path;

pub fn run_fingerprint(cfg: &SliceupConfig, file: &str, chunk_size: Option<u64>) -> Result<()> {
    let chunk_size = chunk_size.unwrap_or(cfg.chunk_size);
    let fp = fingerprint::file_fingerprint(Path::new(file), chunk_size)?;
    println!("{}  {}", fp, file);
    Ok(())
}
