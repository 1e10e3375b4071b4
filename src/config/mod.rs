use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for rendering and tile retrieval, loadable from a JSON file.
/// Every field has a default so a partial file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Directory holding cached tiles
    pub cache_dir: PathBuf,

    /// Cached tiles older than this are downloaded again
    pub max_tile_age_hours: i64,

    /// Tile URL with `{s}`, `{z}`, `{x}` and `{y}` placeholders
    pub tile_url_template: String,

    /// Mirror subdomains substituted for `{s}`
    pub subdomains: Vec<String>,

    /// Sent as the User-Agent header with every tile request
    pub user_agent: String,

    pub max_download_attempts: u32,

    /// Pause between failed download attempts
    pub retry_delay_ms: u64,

    pub request_timeout_secs: u64,

    /// Fetch the tiles of one map in parallel
    pub parallel_fetch: bool,

    /// Seed for mirror selection; random when unset
    pub rng_seed: Option<u64>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache/tiles"),
            max_tile_age_hours: 8 * 24,
            tile_url_template: "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            max_download_attempts: 10,
            retry_delay_ms: 0,
            request_timeout_secs: 30,
            parallel_fetch: false,
            rng_seed: None,
        }
    }
}

impl MapConfig {
    /// Load a config from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn max_tile_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_tile_age_hours)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
