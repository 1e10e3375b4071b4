use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Edge length of a map tile in pixels
pub const TILE_SIZE: u32 = 256;

/// Highest zoom level the zoom selector will pick
pub const MAX_AUTO_ZOOM: u8 = 18;

/// Highest zoom level a tile may have (used for point of interest maps)
pub const MAX_ZOOM: u8 = 19;

/// Padding in pixels kept free on each side when fitting an extent
pub const PADDING_X: u32 = 12;
pub const PADDING_Y: u32 = 12;

/// Web Mercator stops being usable beyond this latitude
pub const MAX_LATITUDE: f64 = 85.051_128_78;

/// A position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the point can be projected
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= MAX_LATITUDE
            && self.lng.abs() <= 180.0
    }

    /// Continuous tile-space position at the given zoom
    pub fn to_tile(&self, zoom: u8) -> (f64, f64) {
        (lon_to_tile_x(self.lng, zoom), lat_to_tile_y(self.lat, zoom))
    }

    /// Pixel on a canvas of `width` x `height` centered on the tile-space `center`
    pub fn to_pixel(&self, zoom: u8, center: (f64, f64), width: u32, height: u32) -> (i32, i32) {
        let (x, y) = self.to_tile(zoom);
        (
            tile_to_pixel(x, center.0, width),
            tile_to_pixel(y, center.1, height),
        )
    }
}

/// Bounding box over a set of points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl Extent {
    /// Returns None for an empty slice
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let initial = Extent {
            min_lat: first.lat,
            min_lng: first.lng,
            max_lat: first.lat,
            max_lng: first.lng,
        };
        Some(points.iter().skip(1).fold(initial, |extent, p| Extent {
            min_lat: extent.min_lat.min(p.lat),
            min_lng: extent.min_lng.min(p.lng),
            max_lat: extent.max_lat.max(p.lat),
            max_lng: extent.max_lng.max(p.lng),
        }))
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lng: (self.min_lng + self.max_lng) / 2.0,
        }
    }
}

/// A tile of the slippy map grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoordinate {
    /// Wrap raw (possibly negative or too large) indices into the grid
    pub fn wrapped(zoom: u8, raw_x: i64, raw_y: i64) -> Self {
        Self {
            zoom,
            x: wrap_tile_index(raw_x, zoom),
            y: wrap_tile_index(raw_y, zoom),
        }
    }
}

/// Number of tiles along one axis at `zoom`
pub fn tiles_per_axis(zoom: u8) -> i64 {
    1i64 << zoom
}

pub fn wrap_tile_index(raw: i64, zoom: u8) -> u32 {
    raw.rem_euclid(tiles_per_axis(zoom)) as u32
}

/// Transform longitude to a tile number
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> f64 {
    ((lon + 180.0) / 360.0) * 2f64.powi(zoom as i32)
}

/// Transform latitude to a tile number
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> f64 {
    let lat_rad = lat * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * 2f64.powi(zoom as i32)
}

pub fn tile_x_to_lon(x: f64, zoom: u8) -> f64 {
    x / 2f64.powi(zoom as i32) * 360.0 - 180.0
}

pub fn tile_y_to_lat(y: f64, zoom: u8) -> f64 {
    let n = 2f64.powi(zoom as i32);
    (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
}

/// Transform a tile number to a pixel on a canvas axis of length `canvas_dim`
pub fn tile_to_pixel(coord: f64, center: f64, canvas_dim: u32) -> i32 {
    ((coord - center) * TILE_SIZE as f64 + canvas_dim as f64 / 2.0).round() as i32
}

/// Find the highest zoom at which the whole extent fits the canvas minus padding.
/// Returns 0 if nothing down to zoom 1 fits.
pub fn calculate_zoom(extent: &Extent, width: u32, height: u32) -> u8 {
    let available_width = width as f64 - (PADDING_X * 2) as f64;
    let available_height = height as f64 - (PADDING_Y * 2) as f64;
    for zoom in (1..=MAX_AUTO_ZOOM).rev() {
        let projected_width =
            (lon_to_tile_x(extent.max_lng, zoom) - lon_to_tile_x(extent.min_lng, zoom)) * TILE_SIZE as f64;
        if projected_width > available_width {
            continue;
        }
        let projected_height =
            (lat_to_tile_y(extent.min_lat, zoom) - lat_to_tile_y(extent.max_lat, zoom)) * TILE_SIZE as f64;
        if projected_height > available_height {
            continue;
        }
        // first zoom that can display the entire extent
        return zoom;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lon_to_tile_x_is_strictly_increasing() {
        for zoom in [0u8, 5, 12, 18] {
            let mut previous = lon_to_tile_x(-180.0, zoom);
            let mut lon = -179.5;
            while lon <= 180.0 {
                let x = lon_to_tile_x(lon, zoom);
                assert!(x > previous, "zoom {} lon {}", zoom, lon);
                previous = x;
                lon += 0.5;
            }
        }
    }

    #[test]
    fn test_lat_to_tile_y_increases_southward() {
        for zoom in [0u8, 7, 18] {
            let mut previous = lat_to_tile_y(85.0, zoom);
            let mut lat = 84.5;
            while lat >= -85.0 {
                let y = lat_to_tile_y(lat, zoom);
                assert!(y > previous, "zoom {} lat {}", zoom, lat);
                previous = y;
                lat -= 0.5;
            }
        }
    }

    #[test]
    fn test_known_tile_positions() {
        assert_eq!(lon_to_tile_x(0.0, 1), 1.0);
        assert!((lat_to_tile_y(0.0, 1) - 1.0).abs() < 1e-12);
        // Munich at zoom 10
        assert_eq!(lon_to_tile_x(11.5755, 10).floor(), 544.0);
        assert_eq!(lat_to_tile_y(48.1374, 10).floor(), 355.0);
    }

    #[test]
    fn test_inverse_projection() {
        let (x, y) = GeoPoint::new(48.05, 11.05).to_tile(14);
        assert!((tile_x_to_lon(x, 14) - 11.05).abs() < 1e-9);
        assert!((tile_y_to_lat(y, 14) - 48.05).abs() < 1e-9);
    }

    #[test]
    fn test_tile_to_pixel() {
        assert_eq!(tile_to_pixel(10.0, 10.0, 800), 400);
        assert_eq!(tile_to_pixel(11.0, 10.0, 800), 656);
        assert_eq!(tile_to_pixel(9.5, 10.0, 600), 172);
    }

    #[test]
    fn test_extent_from_points() {
        assert_eq!(Extent::from_points(&[]), None);
        let extent = Extent::from_points(&[
            GeoPoint::new(48.1, 11.0),
            GeoPoint::new(48.0, 11.2),
            GeoPoint::new(48.05, 11.1),
        ])
        .expect("Non-empty");
        assert_eq!(extent.min_lat, 48.0);
        assert_eq!(extent.max_lat, 48.1);
        assert_eq!(extent.min_lng, 11.0);
        assert_eq!(extent.max_lng, 11.2);
        let center = extent.center();
        assert!((center.lat - 48.05).abs() < 1e-12);
        assert!((center.lng - 11.1).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_extent_gets_maximum_zoom() {
        let extent = Extent::from_points(&[GeoPoint::new(48.05, 11.05)]).expect("Non-empty");
        assert_eq!(calculate_zoom(&extent, 400, 300), MAX_AUTO_ZOOM);
    }

    #[test]
    fn test_zoom_selection_exact_fit() {
        // Extent exactly 256 - 24 pixels wide at zoom 10, double that at zoom 11
        let zoom = 10;
        let width = 256u32;
        let min_x = 544.0;
        let max_x = min_x + (width - 2 * PADDING_X) as f64 / TILE_SIZE as f64;
        let extent = Extent {
            min_lat: 48.0,
            max_lat: 48.0,
            min_lng: tile_x_to_lon(min_x, zoom),
            max_lng: tile_x_to_lon(max_x, zoom),
        };
        let projected = (lon_to_tile_x(extent.max_lng, zoom) - lon_to_tile_x(extent.min_lng, zoom))
            * TILE_SIZE as f64;
        // Nudge by float noise so the extent is never a hair too wide
        let width = width + if projected > (width - 24) as f64 { 1 } else { 0 };
        assert_eq!(calculate_zoom(&extent, width, 1000), zoom);
    }

    #[test]
    fn test_zoom_for_whole_world_is_zero() {
        let extent = Extent {
            min_lat: -80.0,
            max_lat: 80.0,
            min_lng: -179.9,
            max_lng: 179.9,
        };
        assert_eq!(calculate_zoom(&extent, 400, 400), 0);
        assert_eq!(calculate_zoom(&extent, 600, 1200), 1);
    }

    #[test]
    fn test_zoom_for_trip_scenario() {
        let extent = Extent::from_points(&[
            GeoPoint::new(48.0, 11.0),
            GeoPoint::new(48.05, 11.1),
            GeoPoint::new(48.1, 11.2),
        ])
        .expect("Non-empty");
        let zoom = calculate_zoom(&extent, 800, 600);
        assert_eq!(zoom, 12);
    }

    #[test]
    fn test_tile_wraparound() {
        for zoom in [1u8, 3, 10] {
            let max_tile = tiles_per_axis(zoom);
            assert_eq!(wrap_tile_index(-1, zoom) as i64, max_tile - 1);
            assert_eq!(wrap_tile_index(max_tile, zoom), 0);
            assert_eq!(wrap_tile_index(max_tile + 2, zoom) as i64, 2 % max_tile);
            assert_eq!(wrap_tile_index(5 % max_tile, zoom) as i64, 5 % max_tile);
        }
        assert_eq!(TileCoordinate::wrapped(2, -1, 4), TileCoordinate { zoom: 2, x: 3, y: 0 });
    }

    #[test]
    fn test_point_validity() {
        assert!(GeoPoint::new(48.0, 11.0).is_valid());
        assert!(!GeoPoint::new(89.9, 11.0).is_valid());
        assert!(!GeoPoint::new(48.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }
}
