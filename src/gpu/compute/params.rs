//! Uniform parameter structs for the compute kernels.
//!
//! These structs must match the WGSL shader definitions exactly,
//! including alignment requirements.

use crate::color::ColorRange;

/// Conversion kernel parameters.
/// WGSL: struct ConvertParams in ycbcr_convert.wgsl (32 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ConvertParams {
    pub width: u32,
    pub height: u32,
    pub luma_offset: f32,
    pub luma_scale: f32,
    pub chroma_scale: f32,
    pub _pad: [f32; 3],
}

impl ConvertParams {
    pub fn new(width: u32, height: u32, range: ColorRange) -> Self {
        Self {
            width,
            height,
            luma_offset: range.luma_offset(),
            luma_scale: range.luma_scale(),
            chroma_scale: range.chroma_scale(),
            _pad: [0.0; 3],
        }
    }
}

/// Blur pass parameters.
/// WGSL: struct BlurParams in gaussian_blur.wgsl (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurParams {
    pub width: u32,
    pub height: u32,
    pub radius: u32,
    pub horizontal: u32,
}

impl BlurParams {
    pub fn new(width: u32, height: u32, radius: u32, horizontal: bool) -> Self {
        Self {
            width,
            height,
            radius,
            horizontal: if horizontal { 1 } else { 0 },
        }
    }
}
