//! Static map images for vehicle trips, charging stops and parking spots,
//! rendered from cached OpenStreetMap tiles.

pub mod cache;
pub mod compose;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod geo;
pub mod provider;

pub use cache::TileCache;
pub use config::MapConfig;
pub use download::{Downloader, FetchError, HttpFetcher, TileFetcher};
pub use error::MapError;
pub use export::{FileExporter, ImageExporter};
pub use geo::{GeoPoint, TileCoordinate};
pub use mapdraw::MapIcon;
pub use provider::{MapMode, MapSpecial, OsmMapProvider, StaticMapProvider};
