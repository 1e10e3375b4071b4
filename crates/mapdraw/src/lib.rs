//! Raster drawing for static map images: color-matrix filters, anti-aliased
//! overlays and a small embedded glyph set.

use image::{Rgba, RgbaImage};
use imageproc::pixelops::interpolate;
use thiserror::Error;

pub mod filter;
pub mod glyph;
pub mod overlay;

pub use filter::{apply_dark_mode, apply_filters, ColorFilter, ColorMatrix, DARK_MODE};
pub use overlay::{draw_attribution, draw_marker, draw_route, MapIcon, ATTRIBUTION};

#[derive(Error, Debug)]
pub enum DrawError {
    #[error("Invalid canvas dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

pub type StatusOr<T> = Result<T, DrawError>;

/// Create a fully transparent canvas
pub fn new_canvas(width: u32, height: u32) -> StatusOr<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(DrawError::InvalidDimensions { width, height });
    }
    Ok(RgbaImage::new(width, height))
}

/// Blend `color` into the pixel at (x, y) weighted by `coverage` and the color's
/// own alpha. Coordinates outside the image are ignored.
pub fn blend_pixel(image: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    let weight = coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
    if weight <= 0.0 {
        return;
    }
    let opaque = Rgba([color[0], color[1], color[2], 255]);
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    *pixel = interpolate(opaque, *pixel, weight);
}
