use image::{Rgba, RgbaImage};

/// Luma weights used by the saturation matrix
const LUMA_R: f32 = 0.3086;
const LUMA_G: f32 = 0.6094;
const LUMA_B: f32 = 0.0820;

/// Offset added by the contrast matrix to every color channel
const CONTRAST_OFFSET: f32 = 0.001;

/// A 5x5 color matrix.
///
/// Pixels are treated as row vectors `[r, g, b, a, 1]` with channels normalized
/// to [0, 1], so row `i` holds the contribution of input channel `i` to every
/// output channel and the last row is a constant translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [[f32; 5]; 5]);

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        [1.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 0.0, 1.0],
    ]);

    /// Scale R, G and B uniformly
    pub fn brightness(brightness: f32) -> Self {
        let mut m = Self::IDENTITY;
        for i in 0..3 {
            m.0[i][i] = brightness;
        }
        m
    }

    /// Negate R, G and B, translated back into range so that `c' = 1 - c`
    pub fn invert() -> Self {
        let mut m = Self::IDENTITY;
        for i in 0..3 {
            m.0[i][i] = -1.0;
            m.0[4][i] = 1.0;
        }
        m
    }

    pub fn contrast(contrast: f32) -> Self {
        let mut m = Self::IDENTITY;
        for i in 0..3 {
            m.0[i][i] = contrast;
            m.0[4][i] = CONTRAST_OFFSET;
        }
        m
    }

    /// Rotation in the (R, G) plane with the blue channel scaled by 2
    pub fn hue_rotate(degrees: f32) -> Self {
        let radians = degrees as f64 * std::f64::consts::PI / 180.0;
        let cos = radians.cos() as f32;
        let sin = radians.sin() as f32;
        ColorMatrix([
            [cos, sin, 0.0, 0.0, 0.0],
            [-sin, -cos, 0.0, 0.0, 0.0],
            [0.0, 0.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Blend every channel toward luma: `diag(s) + (1 - s) * luma`
    pub fn saturation(saturation: f32) -> Self {
        let complement = 1.0 - saturation;
        let r = LUMA_R * complement;
        let g = LUMA_G * complement;
        let b = LUMA_B * complement;
        ColorMatrix([
            [r + saturation, r, r, 0.0, 0.0],
            [g, g + saturation, g, 0.0, 0.0],
            [b, b, b + saturation, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Transform one normalized RGBA value. The result is not clamped.
    pub fn transform(&self, input: [f32; 4]) -> [f32; 4] {
        let mut output = [0.0f32; 4];
        for (j, out) in output.iter_mut().enumerate() {
            let mut sum = self.0[4][j];
            for (i, value) in input.iter().enumerate() {
                sum += value * self.0[i][j];
            }
            *out = sum;
        }
        output
    }

    /// Apply the matrix to every pixel, returning a new image. Channels are
    /// clamped and quantized back to 8 bits.
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let mut output = image.clone();
        for pixel in output.pixels_mut() {
            let input = [
                pixel[0] as f32 / 255.0,
                pixel[1] as f32 / 255.0,
                pixel[2] as f32 / 255.0,
                pixel[3] as f32 / 255.0,
            ];
            let [r, g, b, a] = self.transform(input);
            *pixel = Rgba([quantize(r), quantize(g), quantize(b), quantize(a)]);
        }
        output
    }
}

fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// One step of a color filter chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorFilter {
    Brightness(f32),
    Invert,
    Contrast(f32),
    HueRotate(f32),
    Saturation(f32),
}

impl ColorFilter {
    pub fn matrix(&self) -> ColorMatrix {
        match *self {
            ColorFilter::Brightness(b) => ColorMatrix::brightness(b),
            ColorFilter::Invert => ColorMatrix::invert(),
            ColorFilter::Contrast(c) => ColorMatrix::contrast(c),
            ColorFilter::HueRotate(degrees) => ColorMatrix::hue_rotate(degrees),
            ColorFilter::Saturation(s) => ColorMatrix::saturation(s),
        }
    }

    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        self.matrix().apply(image)
    }
}

/// The dark mode chain. Order and parameters are fixed.
pub const DARK_MODE: [ColorFilter; 7] = [
    ColorFilter::Brightness(0.6),
    ColorFilter::Invert,
    ColorFilter::Contrast(1.3),
    ColorFilter::HueRotate(-170.0),
    ColorFilter::Saturation(0.3),
    ColorFilter::Brightness(0.7),
    ColorFilter::Contrast(1.3),
];

/// Apply filters in order. Each step is quantized before the next one runs.
pub fn apply_filters(image: &RgbaImage, filters: &[ColorFilter]) -> RgbaImage {
    filters
        .iter()
        .fold(image.clone(), |current, filter| filter.apply(&current))
}

pub fn apply_dark_mode(image: &RgbaImage) -> RgbaImage {
    apply_filters(image, &DARK_MODE)
}
