use anyhow::{Context, Result};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use uuid::Uuid;

use crate::config::MapConfig;
use crate::geo::TileCoordinate;

/// Reasons a single download attempt fails
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Response is not an image: {0}")]
    InvalidImage(#[from] image::ImageError),

    #[error("Failed to store tile: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches the raw bytes behind a tile URL
pub trait TileFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP fetcher that identifies itself with a fixed User-Agent
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl TileFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Downloader for map tiles from a set of mirror hosts
pub struct Downloader {
    fetcher: Box<dyn TileFetcher>,
    rng: Mutex<StdRng>,
    url_template: String,
    subdomains: Vec<String>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Downloader {
    /// Create a downloader with an explicit fetcher and random source
    pub fn new(fetcher: Box<dyn TileFetcher>, rng: StdRng, config: &MapConfig) -> Self {
        Self {
            fetcher,
            rng: Mutex::new(rng),
            url_template: config.tile_url_template.clone(),
            subdomains: config.subdomains.clone(),
            max_attempts: config.max_download_attempts,
            retry_delay: config.retry_delay(),
        }
    }

    /// Create an HTTP downloader; the random source is seeded from the config when set
    pub fn from_config(config: &MapConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.user_agent, config.request_timeout())?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::new(Box::new(fetcher), rng, config))
    }

    /// Build the URL of a tile on the given mirror
    pub fn tile_url(&self, tile: TileCoordinate, subdomain: &str) -> String {
        self.url_template
            .replace("{s}", subdomain)
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    fn pick_subdomain(&self) -> &str {
        if self.subdomains.is_empty() {
            return "";
        }
        let index = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..self.subdomains.len());
        &self.subdomains[index]
    }

    /// Download `tile` into `dest`, retrying on a randomly picked mirror each time.
    /// Failures are logged and never returned; the result tells whether a tile was stored.
    /// A tile written to `dest` by someone else during the retries ends the loop.
    pub fn download(&self, tile: TileCoordinate, dest: &Path) -> bool {
        let initial = modified_time(dest);
        for attempt in 1..=self.max_attempts {
            let current = modified_time(dest);
            if current.is_some() && current != initial {
                debug!("Tile {} appeared while retrying", dest.display());
                return true;
            }
            let url = self.tile_url(tile, self.pick_subdomain());
            debug!("Downloading tile {} (attempt {}/{})", url, attempt, self.max_attempts);

            match self.try_download(&url, dest) {
                Ok(()) => {
                    debug!("Stored tile at {}", dest.display());
                    return true;
                }
                Err(e) => warn!("Tile download failed for {}: {}", url, e),
            }

            if attempt < self.max_attempts && !self.retry_delay.is_zero() {
                thread::sleep(self.retry_delay);
            }
        }
        warn!(
            "Giving up on tile {}/{}/{} after {} attempts",
            tile.zoom, tile.x, tile.y, self.max_attempts
        );
        false
    }

    fn try_download(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let data = self.fetcher.fetch(url)?;
        image::load_from_memory(&data)?;

        // Write next to the target and rename so readers never see a partial tile
        let tmp_path = dest.with_extension(format!("{}.tmp", Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp_path, &data).and_then(|_| fs::rename(&tmp_path, dest)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
}
