use anyhow::Result;
use image::RgbaImage;
use log::info;
use mapdraw::{apply_dark_mode, draw_attribution, draw_marker, draw_route, new_canvas, MapIcon};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cache::TileCache;
use crate::compose::draw_map_layer;
use crate::config::MapConfig;
use crate::download::Downloader;
use crate::error::MapError;
use crate::export::{FileExporter, ImageExporter};
use crate::geo::{calculate_zoom, Extent, GeoPoint, MAX_ZOOM};

/// Zoom used for charging and parking maps
pub const POI_ZOOM: u8 = MAX_ZOOM;

/// Pause callers should keep between two map requests to the same tile server
pub const MIN_REQUEST_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapMode {
    #[default]
    Normal,
    Dark,
}

/// Extra map decorations; none are defined yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapSpecial {
    #[default]
    None,
}

/// A source of static map images
pub trait StaticMapProvider {
    /// Render a trip route with start and end markers to `output`
    fn create_trip_map(
        &self,
        points: &[GeoPoint],
        width: u32,
        height: u32,
        mode: MapMode,
        special: MapSpecial,
        output: &Path,
    ) -> Result<(), MapError>;

    /// Render a single point of interest marked with `icon` to `output`
    fn create_poi_map(
        &self,
        point: GeoPoint,
        icon: MapIcon,
        width: u32,
        height: u32,
        mode: MapMode,
        special: MapSpecial,
        output: &Path,
    ) -> Result<(), MapError>;

    fn create_charging_map(
        &self,
        point: GeoPoint,
        width: u32,
        height: u32,
        mode: MapMode,
        special: MapSpecial,
        output: &Path,
    ) -> Result<(), MapError> {
        self.create_poi_map(point, MapIcon::Charge, width, height, mode, special, output)
    }

    fn create_parking_map(
        &self,
        point: GeoPoint,
        width: u32,
        height: u32,
        mode: MapMode,
        special: MapSpecial,
        output: &Path,
    ) -> Result<(), MapError> {
        self.create_poi_map(point, MapIcon::Park, width, height, mode, special, output)
    }

    /// Minimum pause in milliseconds between two calls. Not enforced here.
    fn minimum_request_interval_ms(&self) -> u64;
}

/// Static maps from OpenStreetMap tiles
pub struct OsmMapProvider {
    cache: TileCache,
    exporter: Box<dyn ImageExporter>,
    parallel_fetch: bool,
}

impl OsmMapProvider {
    pub fn new(cache: TileCache, exporter: Box<dyn ImageExporter>, parallel_fetch: bool) -> Self {
        Self {
            cache,
            exporter,
            parallel_fetch,
        }
    }

    /// Provider downloading over HTTP into the configured cache and writing files
    pub fn from_config(config: &MapConfig) -> Result<Self> {
        let downloader = Downloader::from_config(config)?;
        let cache = TileCache::new(&config.cache_dir, config.max_tile_age(), downloader)?;
        Ok(Self::new(cache, Box::new(FileExporter), config.parallel_fetch))
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Render a trip map without writing it anywhere
    pub fn render_trip_map(
        &self,
        points: &[GeoPoint],
        width: u32,
        height: u32,
        mode: MapMode,
    ) -> Result<RgbaImage, MapError> {
        let extent = Extent::from_points(points).ok_or(MapError::EmptyTrip)?;
        points.iter().try_for_each(validate_point)?;

        let zoom = calculate_zoom(&extent, width, height);
        let center = extent.center().to_tile(zoom);
        info!(
            "Rendering trip of {} points at zoom {} ({}x{}, {:?})",
            points.len(),
            zoom,
            width,
            height,
            mode
        );

        let mut map = self.draw_base_map(width, height, zoom, center, mode)?;
        let pixels: Vec<(i32, i32)> = points
            .iter()
            .map(|point| point.to_pixel(zoom, center, width, height))
            .collect();
        let segments = draw_route(&mut map, &pixels);
        log::debug!("Drew {} route segments", segments);

        if let (Some(&(start_x, start_y)), Some(&(end_x, end_y))) = (pixels.first(), pixels.last()) {
            draw_marker(&mut map, start_x, start_y, MapIcon::Start);
            draw_marker(&mut map, end_x, end_y, MapIcon::End);
        }
        Ok(map)
    }

    /// Render a point map centered on `point` without writing it anywhere
    pub fn render_poi_map(
        &self,
        point: GeoPoint,
        icon: MapIcon,
        width: u32,
        height: u32,
        mode: MapMode,
    ) -> Result<RgbaImage, MapError> {
        validate_point(&point)?;

        let center = point.to_tile(POI_ZOOM);
        info!(
            "Rendering {:?} map at {}, {} ({}x{}, {:?})",
            icon, point.lat, point.lng, width, height, mode
        );

        let mut map = self.draw_base_map(width, height, POI_ZOOM, center, mode)?;
        let (x, y) = point.to_pixel(POI_ZOOM, center, width, height);
        draw_marker(&mut map, x, y, icon);
        Ok(map)
    }

    /// Tiles, then the optional dark filter, then the attribution
    fn draw_base_map(
        &self,
        width: u32,
        height: u32,
        zoom: u8,
        center: (f64, f64),
        mode: MapMode,
    ) -> Result<RgbaImage, MapError> {
        let mut map = new_canvas(width, height)?;
        draw_map_layer(&mut map, &self.cache, zoom, center, self.parallel_fetch);
        if mode == MapMode::Dark {
            map = apply_dark_mode(&map);
        }
        draw_attribution(&mut map, mapdraw::ATTRIBUTION);
        Ok(map)
    }
}

impl StaticMapProvider for OsmMapProvider {
    fn create_trip_map(
        &self,
        points: &[GeoPoint],
        width: u32,
        height: u32,
        mode: MapMode,
        _special: MapSpecial,
        output: &Path,
    ) -> Result<(), MapError> {
        let map = self.render_trip_map(points, width, height, mode)?;
        self.exporter.export(&map, output)
    }

    fn create_poi_map(
        &self,
        point: GeoPoint,
        icon: MapIcon,
        width: u32,
        height: u32,
        mode: MapMode,
        _special: MapSpecial,
        output: &Path,
    ) -> Result<(), MapError> {
        let map = self.render_poi_map(point, icon, width, height, mode)?;
        self.exporter.export(&map, output)
    }

    fn minimum_request_interval_ms(&self) -> u64 {
        MIN_REQUEST_INTERVAL_MS
    }
}

fn validate_point(point: &GeoPoint) -> Result<(), MapError> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(MapError::InvalidCoordinate {
            lat: point.lat,
            lng: point.lng,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::testing::{png_tile, test_downloader, FakeFetcher};
    use chrono::Duration;
    use image::Rgba;

    const LAND: Rgba<u8> = Rgba([242, 239, 233, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 128, 0, 255]);
    const ORANGE_RED: Rgba<u8> = Rgba([255, 69, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn test_provider(dir: &Path, fetcher: &FakeFetcher) -> OsmMapProvider {
        let downloader = test_downloader(fetcher.clone(), &MapConfig::default());
        let cache = TileCache::new(dir, Duration::days(8), downloader).expect("Failed to create cache");
        OsmMapProvider::new(cache, Box::new(FileExporter), false)
    }

    fn trip() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(48.0, 11.0),
            GeoPoint::new(48.05, 11.1),
            GeoPoint::new(48.1, 11.2),
        ]
    }

    fn is_blueish(pixel: &Rgba<u8>) -> bool {
        pixel[2] > 200 && pixel[0] < 60 && pixel[1] < 60
    }

    #[test]
    fn test_trip_map() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::solid(LAND);
        let provider = test_provider(dir.path(), &fetcher);

        let map = provider
            .render_trip_map(&trip(), 800, 600, MapMode::Normal)
            .expect("Failed to render");

        assert_eq!(map.dimensions(), (800, 600));
        // Start at (109, 518), end at (691, 82), middle point at (400, 300)
        assert_eq!(map.get_pixel(108, 510), &RED);
        assert_eq!(map.get_pixel(690, 74), &GREEN);
        assert!(is_blueish(map.get_pixel(399, 300)));
        assert_eq!(map.get_pixel(20, 20), &LAND);
        // Attribution box darkens the bottom-right corner
        let corner = map.get_pixel(797, 597);
        assert!(corner[0] < LAND[0] && corner[3] == 255, "corner was {:?}", corner);
        assert!(fetcher.urls().iter().all(|url| url.contains("/12/")));
    }

    #[test]
    fn test_trip_map_across_date_line_has_no_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::solid(LAND);
        let provider = test_provider(dir.path(), &fetcher);
        let points = [GeoPoint::new(10.0, -179.9), GeoPoint::new(-10.0, 179.9)];

        let map = provider
            .render_trip_map(&points, 800, 600, MapMode::Normal)
            .expect("Failed to render");

        assert!(map.pixels().all(|p| p[3] == 255), "gap in map");
        assert!(fetcher.urls().iter().all(|url| url.contains("/1/")));
    }

    #[test]
    fn test_single_point_trip() {
        let dir = tempfile::tempdir().unwrap();
        let provider = test_provider(dir.path(), &FakeFetcher::solid(LAND));
        let map = provider
            .render_trip_map(&[GeoPoint::new(48.05, 11.05)], 400, 300, MapMode::Normal)
            .expect("Failed to render");
        // Both markers sit at the center, the end marker on top
        assert_eq!(map.get_pixel(199, 142), &GREEN);
    }

    #[test]
    fn test_charging_map_in_dark_mode() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::solid(LAND);
        let provider = test_provider(dir.path(), &fetcher);
        let point = GeoPoint::new(48.05, 11.05);

        let normal = provider
            .render_poi_map(point, MapIcon::Charge, 400, 400, MapMode::Normal)
            .expect("Failed to render");
        let dark = provider
            .render_poi_map(point, MapIcon::Charge, 400, 400, MapMode::Dark)
            .expect("Failed to render");

        assert!(fetcher.urls().iter().all(|url| url.contains("/19/")));
        // Marker is centered and drawn after the filter
        assert_eq!(normal.get_pixel(192, 180), &ORANGE_RED);
        assert_eq!(dark.get_pixel(192, 180), &ORANGE_RED);
        // Background is the filtered tile
        assert_eq!(normal.get_pixel(10, 10), &LAND);
        let expected = apply_dark_mode(&RgbaImage::from_pixel(1, 1, LAND));
        assert_eq!(dark.get_pixel(10, 10), expected.get_pixel(0, 0));
    }

    #[test]
    fn test_parking_map_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let provider = test_provider(&dir.path().join("tiles"), &FakeFetcher::solid(LAND));
        let output = dir.path().join("parking.png");

        provider
            .create_parking_map(
                GeoPoint::new(40.7, -74.0),
                300,
                200,
                MapMode::Normal,
                MapSpecial::None,
                &output,
            )
            .expect("Failed to create map");

        let saved = image::open(&output).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (300, 200));
        // Parking marker head is blue
        assert_eq!(saved.get_pixel(142, 80), &BLUE);
    }

    #[test]
    fn test_trip_map_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let provider = test_provider(&dir.path().join("tiles"), &FakeFetcher::solid(LAND));
        let output = dir.path().join("trip.png");

        provider
            .create_trip_map(&trip(), 800, 600, MapMode::Dark, MapSpecial::None, &output)
            .expect("Failed to create map");

        assert!(output.exists());
    }

    #[test]
    fn test_failed_tiles_still_produce_a_map() {
        let dir = tempfile::tempdir().unwrap();
        let config = MapConfig {
            max_download_attempts: 1,
            ..MapConfig::default()
        };
        let downloader = test_downloader(FakeFetcher::failing(), &config);
        let cache = TileCache::new(dir.path(), Duration::days(8), downloader).unwrap();
        let provider = OsmMapProvider::new(cache, Box::new(FileExporter), true);

        let map = provider
            .render_poi_map(GeoPoint::new(48.05, 11.05), MapIcon::Charge, 200, 200, MapMode::Normal)
            .expect("Failed to render");
        assert_eq!(map.get_pixel(10, 10), &Rgba([0, 0, 0, 0]));
        assert_eq!(map.get_pixel(92, 80), &ORANGE_RED);
    }

    #[test]
    fn test_invalid_requests_fetch_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::solid(LAND);
        let provider = test_provider(dir.path(), &fetcher);

        assert!(matches!(
            provider.render_trip_map(&[], 800, 600, MapMode::Normal),
            Err(MapError::EmptyTrip)
        ));
        assert!(matches!(
            provider.render_trip_map(&trip(), 0, 600, MapMode::Normal),
            Err(MapError::InvalidDimensions { width: 0, height: 600 })
        ));
        assert!(matches!(
            provider.render_poi_map(GeoPoint::new(95.0, 0.0), MapIcon::Park, 100, 100, MapMode::Normal),
            Err(MapError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            provider.render_poi_map(GeoPoint::new(48.0, 11.0), MapIcon::Park, 100, 0, MapMode::Dark),
            Err(MapError::InvalidDimensions { .. })
        ));
        assert_eq!(fetcher.request_count(), 0);
    }

    #[test]
    fn test_minimum_request_interval() {
        let dir = tempfile::tempdir().unwrap();
        let provider = test_provider(dir.path(), &FakeFetcher::failing());
        assert_eq!(provider.minimum_request_interval_ms(), 500);
    }

    #[test]
    fn test_tile_body_is_png() {
        // Guards the fixtures used above
        assert!(image::load_from_memory(&png_tile(LAND)).is_ok());
    }
}
