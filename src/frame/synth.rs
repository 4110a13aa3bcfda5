//! Synthetic frame generation for testing.
//!
//! Generates test frames like solid swatches, checkerboards and moving
//! gradients for unit tests, integration tests and the demo source.

use super::HostFrame;
use crate::color::rgb_to_ycbcr;

/// Generate a frame filled with one YCbCr color.
pub fn solid_frame(width: u32, height: u32, y: u8, cb: u8, cr: u8) -> HostFrame {
    let mut frame = HostFrame::new(width, height);
    frame.fill(y, cb, cr);
    frame
}

/// Generate a frame filled with one RGB color (full-range BT.601 encoding).
pub fn rgb_frame(width: u32, height: u32, r: u8, g: u8, b: u8) -> HostFrame {
    let [y, cb, cr] = rgb_to_ycbcr(r, g, b);
    solid_frame(width, height, y, cb, cr)
}

/// Generate a grey checkerboard with neutral chroma.
///
/// With `cell = 1` this is the highest-frequency pattern a frame can hold.
pub fn checkerboard_frame(width: u32, height: u32, cell: u32) -> HostFrame {
    let cell = cell.max(1);
    let mut frame = HostFrame::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            frame.set_luma(x, y, if on { 255 } else { 0 });
        }
    }
    frame
}

/// Generate a diagonal color gradient that scrolls with `frame_index`.
pub fn gradient_frame(width: u32, height: u32, frame_index: u64) -> HostFrame {
    let mut frame = HostFrame::new(width, height);
    let shift = (frame_index * 4) as u32;

    for y in 0..height {
        for x in 0..width {
            let value = ((x + y + shift) % 256) as u8;
            frame.set_luma(x, y, value);
        }
    }

    for cy in 0..frame.chroma_height() {
        for cx in 0..frame.chroma_width() {
            let cb = ((cx * 255) / frame.chroma_width().max(1)) as u8;
            let cr = ((cy * 255) / frame.chroma_height().max(1)) as u8;
            frame.set_chroma(cx, cy, cb, cr);
        }
    }

    frame
}
