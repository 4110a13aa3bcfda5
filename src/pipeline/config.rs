//! Startup configuration for the frame pipeline.

use crate::color::ColorRange;
use crate::gpu::compute::DispatchGeometry;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed camera preset width.
pub const WORKING_WIDTH: u32 = 2048;
/// Fixed camera preset height.
pub const WORKING_HEIGHT: u32 = 1536;
/// Threads per workgroup side.
pub const THREADGROUP_SIZE: u32 = 16;
/// Upper end of the user-facing σ range.
pub const MAX_BLUR_SIGMA: f32 = 50.0;
/// Triple buffering.
pub const DEFAULT_SURFACE_BUFFERS: u32 = 3;

/// Errors in a [`PipelineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Working resolution {width}x{height} has a zero dimension")]
    ZeroDimension { width: u32, height: u32 },
    #[error("Working resolution {width}x{height} must be even for 4:2:0 chroma")]
    OddDimension { width: u32, height: u32 },
    #[error("Working resolution {width}x{height} exceeds the device texture limit {max}")]
    ExceedsTextureLimit { width: u32, height: u32, max: u32 },
    #[error("Workgroup size {size} is invalid (device allows {max} invocations per workgroup)")]
    InvalidWorkgroupSize { size: u32, max: u32 },
    #[error("Maximum blur sigma {0} must be finite and non-negative")]
    InvalidMaxSigma(f32),
    #[error("Maximum blur sigma {max_sigma} exceeds the supported {limit}")]
    MaxSigmaTooLarge { max_sigma: f32, limit: f32 },
    #[error("Initial blur sigma {sigma} is outside [0, {max}]")]
    InitialSigmaOutOfRange { sigma: f32, max: f32 },
    #[error("Surface buffer count {0} must be 2 or 3")]
    InvalidSurfaceBuffers(u32),
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Values fixed for the lifetime of a [`FramePipeline`](super::FramePipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Working resolution; every frame's luma plane and the drawable must match.
    pub width: u32,
    pub height: u32,
    /// Side of the square compute workgroup.
    pub workgroup_size: u32,
    pub color_range: ColorRange,
    /// σ set through [`BlurControl`](super::BlurControl) is clamped to this.
    pub max_sigma: f32,
    pub initial_sigma: f32,
    /// Drawables in the presentation ring (2 or 3).
    pub surface_buffers: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: WORKING_WIDTH,
            height: WORKING_HEIGHT,
            workgroup_size: THREADGROUP_SIZE,
            color_range: ColorRange::Full,
            max_sigma: MAX_BLUR_SIGMA,
            initial_sigma: 0.0,
            surface_buffers: DEFAULT_SURFACE_BUFFERS,
        }
    }
}

impl PipelineConfig {
    /// Config at a non-default working resolution.
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the config against the device it will run on.
    pub fn validate(&self, limits: &wgpu::Limits) -> Result<(), ConfigError> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroDimension { width, height });
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(ConfigError::OddDimension { width, height });
        }
        let max = limits.max_texture_dimension_2d;
        if width > max || height > max {
            return Err(ConfigError::ExceedsTextureLimit { width, height, max });
        }

        let size = self.workgroup_size;
        let max_invocations = limits.max_compute_invocations_per_workgroup;
        if size == 0
            || size > limits.max_compute_workgroup_size_x
            || size > limits.max_compute_workgroup_size_y
            || size.saturating_mul(size) > max_invocations
        {
            return Err(ConfigError::InvalidWorkgroupSize {
                size,
                max: max_invocations,
            });
        }

        if !self.max_sigma.is_finite() || self.max_sigma < 0.0 {
            return Err(ConfigError::InvalidMaxSigma(self.max_sigma));
        }
        // Larger σ needs a kernel radius the blur filter cannot build
        if self.max_sigma > MAX_BLUR_SIGMA {
            return Err(ConfigError::MaxSigmaTooLarge {
                max_sigma: self.max_sigma,
                limit: MAX_BLUR_SIGMA,
            });
        }
        if !(0.0..=self.max_sigma).contains(&self.initial_sigma) {
            return Err(ConfigError::InitialSigmaOutOfRange {
                sigma: self.initial_sigma,
                max: self.max_sigma,
            });
        }

        if !(2..=3).contains(&self.surface_buffers) {
            return Err(ConfigError::InvalidSurfaceBuffers(self.surface_buffers));
        }

        Ok(())
    }

    /// Grid covering the working resolution.
    pub fn geometry(&self) -> DispatchGeometry {
        DispatchGeometry::new(self.width, self.height, self.workgroup_size)
    }
}
