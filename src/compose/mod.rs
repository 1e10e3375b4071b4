use image::{imageops, RgbaImage};
use log::debug;
use rayon::prelude::*;

use crate::cache::TileCache;
use crate::geo::{tile_to_pixel, TileCoordinate, TILE_SIZE};

/// Half-open range of raw tile indices covering a canvas. Indices may lie
/// outside the tile grid; they are wrapped only when the tile is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub x_min: i64,
    pub x_max: i64,
    pub y_min: i64,
    pub y_max: i64,
}

impl TileRange {
    /// All raw indices in the range, column by column
    pub fn tiles(&self) -> Vec<(i64, i64)> {
        (self.x_min..self.x_max)
            .flat_map(|x| (self.y_min..self.y_max).map(move |y| (x, y)))
            .collect()
    }

    pub fn len(&self) -> usize {
        ((self.x_max - self.x_min).max(0) * (self.y_max - self.y_min).max(0)) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tiles needed to cover a `width` x `height` canvas centered on `center` (tile space)
pub fn visible_tiles(width: u32, height: u32, center: (f64, f64)) -> TileRange {
    let half_width = width as f64 / TILE_SIZE as f64 / 2.0;
    let half_height = height as f64 / TILE_SIZE as f64 / 2.0;
    TileRange {
        x_min: (center.0 - half_width).floor() as i64,
        x_max: (center.0 + half_width).ceil() as i64,
        y_min: (center.1 - half_height).floor() as i64,
        y_max: (center.1 + half_height).ceil() as i64,
    }
}

/// Draw the base map onto `canvas`. Every covering tile is placed at the
/// position of its raw index, so a canvas wider than the world repeats it.
pub fn draw_map_layer(
    canvas: &mut RgbaImage,
    cache: &TileCache,
    zoom: u8,
    center: (f64, f64),
    parallel: bool,
) {
    let (width, height) = canvas.dimensions();
    let raw_tiles = visible_tiles(width, height, center).tiles();
    debug!("Drawing {} tiles at zoom {}", raw_tiles.len(), zoom);

    let fetch = |&(x, y): &(i64, i64)| cache.get_tile(TileCoordinate::wrapped(zoom, x, y));
    let images: Vec<RgbaImage> = if parallel {
        raw_tiles.par_iter().map(fetch).collect()
    } else {
        raw_tiles.iter().map(fetch).collect()
    };

    for (&(x, y), tile) in raw_tiles.iter().zip(images.iter()) {
        let left = tile_to_pixel(x as f64, center.0, width);
        let top = tile_to_pixel(y as f64, center.1, height);
        imageops::replace(canvas, tile, left as i64, top as i64);
    }
}
