use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_antialiased_line_segment_mut;
use imageproc::pixelops::interpolate;
use imageproc::rect::Rect;

use crate::blend_pixel;
use crate::glyph::{draw_text, text_size, LIGHTNING};

pub const ATTRIBUTION: &str = "(C) OpenStreetMap";
const ATTRIBUTION_PADDING: u32 = 3;
const ATTRIBUTION_FILL: Rgba<u8> = Rgba([128, 128, 128, 128]);
const ATTRIBUTION_CORNER_RADIUS: f32 = 3.0;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const ROUTE_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);
const ROUTE_OUTLINE_WIDTH: f32 = 4.0;
const ROUTE_WIDTH: f32 = 2.0;

const LABEL_SCALE: u32 = 2;
/// Subsamples per pixel axis when filling shapes
const SUBSAMPLES: u32 = 4;

/// Marker kinds drawn on a map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapIcon {
    Start,
    End,
    Charge,
    Park,
}

impl MapIcon {
    pub fn color(&self) -> Rgba<u8> {
        match self {
            MapIcon::Start => Rgba([255, 0, 0, 255]),
            MapIcon::End => Rgba([0, 128, 0, 255]),
            MapIcon::Charge => Rgba([255, 69, 0, 255]),
            MapIcon::Park => Rgba([0, 0, 255, 255]),
        }
    }

    pub fn scale(&self) -> i32 {
        match self {
            MapIcon::Start | MapIcon::End => 1,
            MapIcon::Charge | MapIcon::Park => 3,
        }
    }

    pub fn label(&self) -> Option<String> {
        match self {
            MapIcon::Charge => Some(LIGHTNING.to_string()),
            MapIcon::Park => Some("P".to_string()),
            MapIcon::Start | MapIcon::End => None,
        }
    }
}

fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / length_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

fn point_in_triangle(p: (f32, f32), a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
    let sign = |p1: (f32, f32), p2: (f32, f32), p3: (f32, f32)| {
        (p1.0 - p3.0) * (p2.1 - p3.1) - (p2.0 - p3.0) * (p1.1 - p3.1)
    };
    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);
    let has_negative = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_positive = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_negative && has_positive)
}

/// Pixel rows and columns of `image` touched by the box, clipped to the image.
fn clipped_span(image: &RgbaImage, min: (f32, f32), max: (f32, f32)) -> (i64, i64, i64, i64) {
    let min_x = (min.0.floor() as i64).max(0);
    let min_y = (min.1.floor() as i64).max(0);
    let max_x = (max.0.ceil() as i64).min(image.width() as i64 - 1);
    let max_y = (max.1.ceil() as i64).min(image.height() as i64 - 1);
    (min_x, min_y, max_x, max_y)
}

/// Anti-aliased line with round caps. Pixel (x, y) covers [x, x+1) x [y, y+1).
pub fn draw_thick_line_aa(
    image: &mut RgbaImage,
    start: (f32, f32),
    end: (f32, f32),
    color: Rgba<u8>,
    width: f32,
) {
    let half = width / 2.0;
    let reach = half + 1.0;
    let (min_x, min_y, max_x, max_y) = clipped_span(
        image,
        (start.0.min(end.0) - reach, start.1.min(end.1) - reach),
        (start.0.max(end.0) + reach, start.1.max(end.1) + reach),
    );
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let center = (x as f32 + 0.5, y as f32 + 0.5);
            let coverage = half + 0.5 - distance_to_segment(center, start, end);
            if coverage > 0.0 {
                blend_pixel(image, x, y, color, coverage);
            }
        }
    }
}

/// Fill every pixel of the box by the fraction of its subsamples inside the shape.
fn fill_aa<F>(image: &mut RgbaImage, min: (f32, f32), max: (f32, f32), color: Rgba<u8>, inside: F)
where
    F: Fn(f32, f32) -> bool,
{
    let (min_x, min_y, max_x, max_y) = clipped_span(image, min, max);
    let step = 1.0 / SUBSAMPLES as f32;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let mut hits = 0;
            for sy in 0..SUBSAMPLES {
                for sx in 0..SUBSAMPLES {
                    let px = x as f32 + (sx as f32 + 0.5) * step;
                    let py = y as f32 + (sy as f32 + 0.5) * step;
                    if inside(px, py) {
                        hits += 1;
                    }
                }
            }
            if hits > 0 {
                let coverage = hits as f32 / (SUBSAMPLES * SUBSAMPLES) as f32;
                blend_pixel(image, x, y, color, coverage);
            }
        }
    }
}

/// 1px outline of the upper half of a circle
fn stroke_upper_arc(image: &mut RgbaImage, center: (f32, f32), radius: f32, color: Rgba<u8>) {
    let (min_x, min_y, max_x, max_y) = clipped_span(
        image,
        (center.0 - radius - 1.0, center.1 - radius - 1.0),
        (center.0 + radius + 1.0, center.1 + 1.0),
    );
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            if py > center.1 + 0.5 {
                continue;
            }
            let distance = ((px - center.0).powi(2) + (py - center.1).powi(2)).sqrt();
            let coverage = 1.0 - (distance - radius).abs();
            if coverage > 0.0 {
                blend_pixel(image, x, y, color, coverage);
            }
        }
    }
}

/// Draw a route through pixel positions: a white halo first, then the blue
/// line on top. Segments whose endpoints share a pixel are skipped.
/// Returns the number of segments drawn.
pub fn draw_route(image: &mut RgbaImage, points: &[(i32, i32)]) -> usize {
    let segments: Vec<((f32, f32), (f32, f32))> = points
        .windows(2)
        .filter(|pair| pair[0] != pair[1])
        .map(|pair| {
            (
                (pair[0].0 as f32, pair[0].1 as f32),
                (pair[1].0 as f32, pair[1].1 as f32),
            )
        })
        .collect();

    for &(start, end) in &segments {
        draw_thick_line_aa(image, start, end, WHITE, ROUTE_OUTLINE_WIDTH);
    }
    for &(start, end) in &segments {
        draw_thick_line_aa(image, start, end, ROUTE_COLOR, ROUTE_WIDTH);
    }
    segments.len()
}

/// Draw a pin whose tip sits at (x, y): a half disc head above a downward
/// triangle, outlined in white, with an optional label over the head.
pub fn draw_marker(image: &mut RgbaImage, x: i32, y: i32, icon: MapIcon) {
    let s = icon.scale() as f32;
    let (xf, yf) = (x as f32, y as f32);
    let head_center = (xf, yf - 6.0 * s);
    let radius = 4.0 * s;
    let left = (xf - 4.0 * s, yf - 6.0 * s);
    let tip = (xf, yf);
    let right = (xf + 4.0 * s, yf - 6.0 * s);

    fill_aa(
        image,
        (xf - radius - 1.0, yf - 10.0 * s - 1.0),
        (xf + radius + 1.0, yf + 1.0),
        icon.color(),
        |px, py| {
            let (dx, dy) = (px - head_center.0, py - head_center.1);
            (dy <= 0.0 && dx * dx + dy * dy <= radius * radius)
                || point_in_triangle((px, py), left, tip, right)
        },
    );

    stroke_upper_arc(image, head_center, radius, WHITE);
    let scale = icon.scale();
    draw_antialiased_line_segment_mut(
        image,
        (x - 4 * scale, y - 6 * scale),
        (x, y),
        WHITE,
        interpolate,
    );
    draw_antialiased_line_segment_mut(
        image,
        (x, y),
        (x + 4 * scale, y - 6 * scale),
        WHITE,
        interpolate,
    );

    if let Some(label) = icon.label() {
        let (width, height) = text_size(&label, LABEL_SCALE);
        draw_text(
            image,
            x as i64 - width as i64 / 2,
            head_center.1 as i64 - height as i64 / 2,
            &label,
            LABEL_SCALE,
            true,
            WHITE,
        );
    }
}

/// Whether the center of pixel (x, y) lies inside `rect` with corners rounded by `radius`
fn inside_rounded_rect(x: i32, y: i32, rect: Rect, radius: f32) -> bool {
    let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
    let (left, top) = (rect.left() as f32, rect.top() as f32);
    let (right, bottom) = (rect.right() as f32 + 1.0, rect.bottom() as f32 + 1.0);
    let cx = px.clamp(left + radius, right - radius);
    let cy = py.clamp(top + radius, bottom - radius);
    (px - cx).powi(2) + (py - cy).powi(2) <= radius * radius
}

/// Draw `text` in black on a translucent gray rounded box in the bottom-right corner.
pub fn draw_attribution(image: &mut RgbaImage, text: &str) {
    let (text_width, text_height) = text_size(text, 1);
    let box_width = text_width + 2 * ATTRIBUTION_PADDING;
    let box_height = text_height + 2 * ATTRIBUTION_PADDING;
    let left = image.width() as i32 - box_width as i32;
    let top = image.height() as i32 - box_height as i32;

    let rect = Rect::at(left, top).of_size(box_width, box_height);
    for y in rect.top()..=rect.bottom() {
        for x in rect.left()..=rect.right() {
            if inside_rounded_rect(x, y, rect, ATTRIBUTION_CORNER_RADIUS) {
                blend_pixel(image, x as i64, y as i64, ATTRIBUTION_FILL, 1.0);
            }
        }
    }
    draw_text(
        image,
        (left + ATTRIBUTION_PADDING as i32) as i64,
        (top + ATTRIBUTION_PADDING as i32) as i64,
        text,
        1,
        false,
        BLACK,
    );
}
