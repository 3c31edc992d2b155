//! Production transport: one libcurl request per chunk.
//!
//! Uses the curl crate's progress callback both to report upload percent
//! and as the per-tick abort checkpoint: returning false from the
//! callback makes libcurl abort the transfer, which surfaces as
//! `is_aborted_by_callback` and settles the request as `Aborted`.

use super::{ChunkTransport, TransportHooks, TransportOutcome, TransportRequest};
use async_trait::async_trait;
use curl::easy::{Easy, List};
use std::time::Duration;

/// Blocking libcurl transport, run under `spawn_blocking` so it can be
/// driven from the async pool.
#[derive(Debug, Clone, Copy)]
pub struct CurlTransport {
    pub connect_timeout: Duration,
    /// Hard wall-clock cap per request so a stuck transfer eventually fails.
    pub request_timeout: Duration,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(600),
        }
    }
}

impl CurlTransport {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
        }
    }
}

#[async_trait]
impl ChunkTransport for CurlTransport {
    async fn send(&self, request: TransportRequest, hooks: TransportHooks) -> TransportOutcome {
        // Last call before committing the slot to a real connection.
        if (hooks.should_abort)() {
            return TransportOutcome::Aborted;
        }
        let connect_timeout = self.connect_timeout;
        let request_timeout = self.request_timeout;
        match tokio::task::spawn_blocking(move || {
            perform(&request, &hooks, connect_timeout, request_timeout)
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => TransportOutcome::Error(format!("transport task join: {}", e)),
        }
    }
}

fn perform(
    request: &TransportRequest,
    hooks: &TransportHooks,
    connect_timeout: Duration,
    request_timeout: Duration,
) -> TransportOutcome {
    match perform_inner(request, hooks, connect_timeout, request_timeout) {
        Ok(outcome) => outcome,
        Err(e) if e.is_aborted_by_callback() => TransportOutcome::Aborted,
        Err(e) => TransportOutcome::Error(e.to_string()),
    }
}

fn perform_inner(
    request: &TransportRequest,
    hooks: &TransportHooks,
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<TransportOutcome, curl::Error> {
    let mut easy = Easy::new();
    easy.url(&request.url)?;
    easy.connect_timeout(connect_timeout)?;
    easy.timeout(request_timeout)?;
    easy.progress(true)?;

    easy.post(true)?;
    easy.post_field_size(request.body.len() as u64)?;
    if !request.method.eq_ignore_ascii_case("POST") {
        easy.custom_request(&request.method)?;
    }

    let mut list = List::new();
    for (name, value) in &request.headers {
        list.append(&format!("{}: {}", name.trim(), value.trim()))?;
    }
    if !request.headers.is_empty() {
        easy.http_headers(list)?;
    }

    let mut response = Vec::new();
    let mut sent = 0usize;
    let mut last_percent: i16 = -1;
    {
        let mut transfer = easy.transfer();
        transfer.read_function(|into| {
            let n = (request.body.len() - sent).min(into.len());
            into[..n].copy_from_slice(&request.body[sent..sent + n]);
            sent += n;
            Ok(n)
        })?;
        transfer.write_function(|data| {
            response.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.progress_function(|_dl_total, _dl_now, ul_total, ul_now| {
            // Readiness tick: abort check first, then progress.
            if (hooks.should_abort)() {
                return false;
            }
            if ul_total > 0.0 {
                let percent = ((ul_now / ul_total) * 100.0).clamp(0.0, 100.0) as i16;
                if percent != last_percent {
                    last_percent = percent;
                    (hooks.on_progress)(percent as u8);
                }
            }
            true
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Ok(TransportOutcome::Error(format!("HTTP {}", code)));
    }
    Ok(TransportOutcome::Success(response))
}
