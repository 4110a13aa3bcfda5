//! BT.601 YCbCr → RGB color math.
//!
//! The constants here are the single source of truth for the conversion
//! kernel: `ycbcr_convert.wgsl` applies the same matrix and the offsets come
//! from [`ColorRange`] through the kernel's uniform block.

use serde::{Deserialize, Serialize};

/// BT.601 Cr contribution to red.
pub const KR_CR: f32 = 1.402;
/// BT.601 Cb contribution to green.
pub const KG_CB: f32 = 0.344_136;
/// BT.601 Cr contribution to green.
pub const KG_CR: f32 = 0.714_136;
/// BT.601 Cb contribution to blue.
pub const KB_CB: f32 = 1.772;

/// Normalized chroma zero point (128 / 255).
pub const CHROMA_OFFSET: f32 = 128.0 / 255.0;

/// Quantization range of the incoming luma/chroma samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRange {
    /// Full range (0–255 luma and chroma), as produced by JPEG-style sensors.
    #[default]
    Full,
    /// Video range (16–235 luma, 16–240 chroma).
    Video,
}

impl ColorRange {
    /// Normalized luma black level.
    pub fn luma_offset(self) -> f32 {
        match self {
            ColorRange::Full => 0.0,
            ColorRange::Video => 16.0 / 255.0,
        }
    }

    /// Scale applied to luma after removing the black level.
    pub fn luma_scale(self) -> f32 {
        match self {
            ColorRange::Full => 1.0,
            ColorRange::Video => 255.0 / 219.0,
        }
    }

    /// Scale applied to chroma after removing [`CHROMA_OFFSET`].
    pub fn chroma_scale(self) -> f32 {
        match self {
            ColorRange::Full => 1.0,
            ColorRange::Video => 255.0 / 224.0,
        }
    }
}

/// Convert normalized YCbCr to normalized RGB, clamped to `[0, 1]`.
pub fn ycbcr_to_rgb_normalized(y: f32, cb: f32, cr: f32, range: ColorRange) -> [f32; 3] {
    let y = (y - range.luma_offset()) * range.luma_scale();
    let cb = (cb - CHROMA_OFFSET) * range.chroma_scale();
    let cr = (cr - CHROMA_OFFSET) * range.chroma_scale();

    [
        (y + KR_CR * cr).clamp(0.0, 1.0),
        (y - KG_CB * cb - KG_CR * cr).clamp(0.0, 1.0),
        (y + KB_CB * cb).clamp(0.0, 1.0),
    ]
}

/// Convert 8-bit YCbCr to 8-bit RGB.
///
/// CPU reference for the conversion kernel.
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8, range: ColorRange) -> [u8; 3] {
    let rgb = ycbcr_to_rgb_normalized(
        y as f32 / 255.0,
        cb as f32 / 255.0,
        cr as f32 / 255.0,
        range,
    );
    rgb.map(|c| (c * 255.0).round() as u8)
}

/// Convert 8-bit RGB to full-range 8-bit YCbCr.
///
/// Used to synthesize test swatches.
pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 + (b - y) / KB_CB;
    let cr = 128.0 + (r - y) / KR_CR;
    [y, cb, cr].map(|c| c.round().clamp(0.0, 255.0) as u8)
}
