//! `sliceup plan <file>` – print the chunk plan without uploading.

use anyhow::Result;
use sliceup_core::chunker;
use sliceup_core::config::SliceupConfig;
use std::path::Path;

pub fn run_plan(cfg: &SliceupConfig, file: &str, chunk_size: Option<u64>) -> Result<()> {
    let chunk_size = chunk_size.unwrap_or(cfg.chunk_size);
    let chunks = chunker::chunk_file(Path::new(file), chunk_size)?;

    println!("{}: {} chunks (chunk size {} bytes)", file, chunks.len(), chunk_size);
    for c in &chunks {
        println!(
            "{:>6}  [{:>12}, {:>12})  {:>10} bytes  {}",
            c.range.index,
            c.range.start,
            c.range.end,
            c.range.len(),
            c.name
        );
    }
    Ok(())
}
