//! `sliceup upload <file>` – run one upload session against the
//! configured endpoint.

use anyhow::{Context, Result};
use sliceup_core::config::SliceupConfig;
use sliceup_core::events::UploadEvent;
use sliceup_core::remote::http::HttpRemote;
use sliceup_core::transport::curl::CurlTransport;
use sliceup_core::transport::{ChunkPayload, TransportRequest};
use sliceup_core::uploader::{SessionStatus, SliceUploader};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

pub async fn run_upload(
    cfg: &SliceupConfig,
    file: &str,
    filename: Option<String>,
    chunk_size: Option<u64>,
    pool_limit: Option<usize>,
) -> Result<()> {
    let upload_url = cfg.upload_url()?;
    let verify_url = cfg.verify_url()?;
    let merge_url = cfg.merge_url()?;

    let mut transport = CurlTransport::default();
    if let Some(secs) = cfg.connect_timeout_secs {
        transport.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = cfg.request_timeout_secs {
        transport.request_timeout = Duration::from_secs(secs);
    }

    let mut remote = HttpRemote::new(verify_url, merge_url);
    remote.connect_timeout = transport.connect_timeout;

    let mut builder = SliceUploader::builder()
        .file(file)
        .chunk_size(chunk_size.unwrap_or(cfg.chunk_size))
        .pool_limit(pool_limit.unwrap_or(cfg.pool_limit))
        .transport(Arc::new(transport))
        .remote(Arc::new(remote))
        .request_builder(move |payload: &ChunkPayload| TransportRequest {
            url: upload_url.clone(),
            method: "POST".to_string(),
            headers: vec![
                (
                    "Content-Type".to_string(),
                    "application/octet-stream".to_string(),
                ),
                ("x-chunk-index".to_string(), payload.index.to_string()),
                ("x-chunk-name".to_string(), payload.name.clone()),
                (
                    "x-chunk-fingerprint".to_string(),
                    payload.fingerprint.clone(),
                ),
                ("x-chunk-total".to_string(), payload.total.to_string()),
            ],
            body: payload.bytes.clone(),
        });
    if let Some(name) = filename {
        builder = builder.filename(name);
    }
    let uploader = Arc::new(builder.build()?);

    uploader.on(|event| match event {
        UploadEvent::Progress { percent } => {
            print!("\rprogress: {:>3}%", percent);
            let _ = std::io::stdout().flush();
        }
        UploadEvent::Error { message } => eprintln!("\nerror: {}", message),
        UploadEvent::Pause => println!("\npaused"),
        UploadEvent::Cancel => println!("\ncancelling, waiting for in-flight chunks..."),
        UploadEvent::Start => {}
    });

    // Ctrl-C cancels the session; in-flight chunks abort at their next
    // transport tick.
    let canceller = Arc::clone(&uploader);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let status = uploader.start().await.context("upload session failed")?;
    println!();
    match status {
        SessionStatus::Success => {
            println!("upload complete: {}", uploader.filename());
            Ok(())
        }
        other => anyhow::bail!(
            "upload did not complete (status {:?}); re-run to resume pending chunks",
            other
        ),
    }
}
