//! HTTP implementation of the verify/merge endpoints (libcurl, JSON).

use super::{MergeRequest, RemoteStore, VerifyRequest, VerifyResponse};
use crate::error::UploadError;
use async_trait::async_trait;
use curl::easy::{Easy, List};
use std::time::Duration;

/// Talks JSON-over-HTTP to the verify and merge endpoints.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    pub verify_url: String,
    pub merge_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl HttpRemote {
    pub fn new(verify_url: String, merge_url: String) -> Self {
        Self {
            verify_url,
            merge_url,
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(60),
        }
    }

    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, UploadError> {
        let url = url.to_string();
        let connect_timeout = self.connect_timeout;
        let request_timeout = self.request_timeout;
        tokio::task::spawn_blocking(move || {
            post_json_blocking(&url, &body, connect_timeout, request_timeout)
        })
        .await
        .map_err(|e| UploadError::Remote(format!("remote task join: {}", e)))?
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn exists(&self, request: &VerifyRequest) -> Result<bool, UploadError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| UploadError::Remote(format!("encode verify request: {}", e)))?;
        let response = self.post_json(&self.verify_url, body).await?;
        let parsed: VerifyResponse = serde_json::from_slice(&response)
            .map_err(|e| UploadError::Remote(format!("decode verify response: {}", e)))?;
        tracing::debug!(exists = parsed.exists, "verify endpoint answered");
        Ok(parsed.exists)
    }

    async fn merge(&self, request: &MergeRequest) -> Result<(), UploadError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| UploadError::Remote(format!("encode merge request: {}", e)))?;
        self.post_json(&self.merge_url, body).await?;
        tracing::info!(filename = %request.filename, "merge requested");
        Ok(())
    }
}

fn post_json_blocking(
    url: &str,
    body: &[u8],
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Vec<u8>, UploadError> {
    let map_curl = |e: curl::Error| UploadError::Remote(e.to_string());

    let mut easy = Easy::new();
    easy.url(url).map_err(map_curl)?;
    easy.connect_timeout(connect_timeout).map_err(map_curl)?;
    easy.timeout(request_timeout).map_err(map_curl)?;
    easy.post(true).map_err(map_curl)?;
    easy.post_fields_copy(body).map_err(map_curl)?;

    let mut list = List::new();
    list.append("Content-Type: application/json")
        .map_err(map_curl)?;
    easy.http_headers(list).map_err(map_curl)?;

    let mut response = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(map_curl)?;
        transfer.perform().map_err(map_curl)?;
    }

    let code = easy.response_code().map_err(map_curl)?;
    if !(200..300).contains(&code) {
        return Err(UploadError::Remote(format!("POST {} returned HTTP {}", url, code)));
    }
    Ok(response)
}
