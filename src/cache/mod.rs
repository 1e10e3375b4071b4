use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use image::{Rgba, RgbaImage};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::download::Downloader;
use crate::geo::{TileCoordinate, TILE_SIZE};

/// Color of the tile served when no usable image exists
pub const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// On-disk tile cache that downloads missing or stale tiles on demand
pub struct TileCache {
    cache_dir: PathBuf,
    max_age: Duration,
    downloader: Downloader,
    /// One lock per tile so a tile is refreshed by a single caller at a time
    locks: Mutex<HashMap<TileCoordinate, Arc<Mutex<()>>>>,
}

impl TileCache {
    /// Create a new cache with the given directory
    pub fn new<P: AsRef<Path>>(cache_dir: P, max_age: Duration, downloader: Downloader) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;
        }

        Ok(Self {
            cache_dir,
            max_age,
            downloader,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cache path for a tile, `{zoom}_{x}_{y}.png`
    pub fn tile_path(&self, tile: TileCoordinate) -> PathBuf {
        self.cache_dir
            .join(format!("{}_{}_{}.png", tile.zoom, tile.x, tile.y))
    }

    /// Whether the file exists and was written within the maximum age
    pub fn is_fresh(&self, path: &Path) -> bool {
        let modified = match fs::metadata(path).and_then(|metadata| metadata.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };
        let modified: DateTime<Utc> = modified.into();
        Utc::now().signed_duration_since(modified) <= self.max_age
    }

    /// Get a tile image, downloading it first when missing or stale.
    ///
    /// Never fails: a stale file is kept when the refresh fails, and a
    /// transparent placeholder is returned when nothing usable is on disk.
    pub fn get_tile(&self, tile: TileCoordinate) -> RgbaImage {
        let path = self.tile_path(tile);
        let lock = self.tile_lock(tile);
        {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            if self.is_fresh(&path) {
                debug!("Using cached tile {}", path.display());
            } else if !self.downloader.download(tile, &path) && path.exists() {
                warn!("Keeping stale tile {}", path.display());
            }
        }
        self.release_tile_lock(tile, lock);
        load_tile(&path)
    }

    fn tile_lock(&self, tile: TileCoordinate) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(tile).or_default().clone()
    }

    /// Drop the table entry once no other caller holds or waits on it
    fn release_tile_lock(&self, tile: TileCoordinate, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the table, one held here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&tile);
        }
    }

    /// Clear the cache
    pub fn clear(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir).context("Failed to remove cache directory")?;
            fs::create_dir_all(&self.cache_dir).context("Failed to recreate cache directory")?;
        }

        Ok(())
    }
}

fn load_tile(path: &Path) -> RgbaImage {
    match image::open(path) {
        Ok(image) => image.to_rgba8(),
        Err(e) => {
            warn!("Using placeholder for {}: {}", path.display(), e);
            placeholder_tile()
        }
    }
}

/// A fully transparent tile
pub fn placeholder_tile() -> RgbaImage {
    RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, PLACEHOLDER_COLOR)
}
