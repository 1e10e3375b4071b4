//! Embedded 5x7 bitmap glyphs for map labels and the attribution text.

use image::{Rgba, RgbaImage};

use crate::blend_pixel;

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal advance per character in glyph cells
const ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Lightning bolt, used as the charging label
pub const LIGHTNING: char = '\u{26A1}';

/// Rows from top to bottom, bit 4 is the leftmost column.
fn rows(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        ' ' => [0b00000; 7],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'a' => [0b00000, 0b00000, 0b01110, 0b00001, 0b01111, 0b10001, 0b01111],
        'e' => [0b00000, 0b00000, 0b01110, 0b10001, 0b11111, 0b10000, 0b01110],
        'n' => [0b00000, 0b00000, 0b10110, 0b11001, 0b10001, 0b10001, 0b10001],
        'p' => [0b00000, 0b00000, 0b11110, 0b10001, 0b11110, 0b10000, 0b10000],
        'r' => [0b00000, 0b00000, 0b10110, 0b11001, 0b10000, 0b10000, 0b10000],
        't' => [0b01000, 0b01000, 0b11100, 0b01000, 0b01000, 0b01001, 0b00110],
        LIGHTNING => [0b00011, 0b00110, 0b01100, 0b11111, 0b00110, 0b01100, 0b11000],
        _ => return None,
    };
    Some(rows)
}

/// Size in pixels of `text` rendered at `scale`
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let count = text.chars().count() as u32;
    if count == 0 {
        return (0, 0);
    }
    ((count * ADVANCE - 1) * scale, GLYPH_HEIGHT * scale)
}

/// Draw `text` with its top-left corner at (x, y). Each glyph cell becomes a
/// `scale` x `scale` block; `bold` stamps every glyph a second time one pixel
/// to the right. Characters without a glyph advance like a space.
pub fn draw_text(
    image: &mut RgbaImage,
    x: i64,
    y: i64,
    text: &str,
    scale: u32,
    bold: bool,
    color: Rgba<u8>,
) {
    let scale = scale.max(1) as i64;
    for (index, c) in text.chars().enumerate() {
        let Some(rows) = rows(c) else {
            log::debug!("No glyph for {:?}", c);
            continue;
        };
        let origin_x = x + index as i64 * ADVANCE as i64 * scale;
        for (row, bits) in rows.iter().enumerate() {
            for column in 0..GLYPH_WIDTH as i64 {
                if bits & (1 << (GLYPH_WIDTH as i64 - 1 - column)) == 0 {
                    continue;
                }
                let cell_x = origin_x + column * scale;
                let cell_y = y + row as i64 * scale;
                let stamp_width = if bold { scale + 1 } else { scale };
                for dy in 0..scale {
                    for dx in 0..stamp_width {
                        blend_pixel(image, cell_x + dx, cell_y + dy, color, 1.0);
                    }
                }
            }
        }
    }
}
