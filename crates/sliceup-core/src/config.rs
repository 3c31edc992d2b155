use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/sliceup/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceupConfig {
    /// Chunk size in bytes.
    pub chunk_size: u64,
    /// Maximum concurrent chunk uploads in flight.
    pub pool_limit: usize,
    /// Base URL of the upload server, e.g. "http://127.0.0.1:3000".
    pub endpoint: String,
    /// Optional connect timeout in seconds (None = built-in default).
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Optional per-request timeout in seconds (None = built-in default).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for SliceupConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2 * 1024 * 1024,
            pool_limit: 4,
            endpoint: "http://127.0.0.1:3000".to_string(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
        }
    }
}

impl SliceupConfig {
    /// URL of the chunk upload endpoint.
    pub fn upload_url(&self) -> Result<String> {
        self.join("upload")
    }

    /// URL of the existence-check endpoint.
    pub fn verify_url(&self) -> Result<String> {
        self.join("verify")
    }

    /// URL of the merge (finalize) endpoint.
    pub fn merge_url(&self) -> Result<String> {
        self.join("merge")
    }

    fn join(&self, path: &str) -> Result<String> {
        let base = url::Url::parse(&self.endpoint)?;
        Ok(base.join(path)?.to_string())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("sliceup")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SliceupConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SliceupConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: SliceupConfig = toml::from_str(&data)?;
    Ok(cfg)
}
