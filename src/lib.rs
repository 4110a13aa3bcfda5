//! YCbCr Blur Core
//!
//! Real-time GPU pipeline for biplanar YCbCr 4:2:0 camera frames.
//!
//! # Features
//!
//! - Plane textures written straight from the frame's memory, leased from a
//!   bounded cache and released on every exit path
//! - BT.601 conversion in a compute kernel that writes the drawable directly
//! - Separable Gaussian blur in place on the drawable, rebuilt only when σ changes
//! - Latest-wins frame handoff and a lock-free σ cell for the UI thread
//! - Window (wgpu surface) and headless presentation
//!
//! # Example
//!
//! ```no_run
//! use ycbcr_blur::{frame::synth, FramePipeline, GpuContext, OffscreenSurface, PipelineConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let ctx = GpuContext::new().await?;
//! let config = PipelineConfig::with_resolution(640, 480);
//! let format = wgpu::TextureFormat::Rgba8Unorm;
//! let mut surface = OffscreenSurface::new(&ctx, 640, 480, format, 3)?;
//! let pipeline = FramePipeline::new(ctx, config, format)?;
//!
//! pipeline.set_blur_sigma(2.0);
//! pipeline.submit_frame(&synth::gradient_frame(640, 480, 0))?;
//! let outcome = pipeline.render(&mut surface);
//! assert!(outcome.is_presented());
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod color;
pub mod frame;
pub mod gpu;
pub mod pipeline;
pub mod surface;

// Re-export commonly used types
pub use bridge::{BridgeError, PlaneTexture, PlaneTextures, TextureBridge, TextureCache};
pub use color::{ycbcr_to_rgb, ColorRange};
pub use frame::{FrameBuffer, HostFrame, Plane, PlaneFormat};
pub use gpu::{BlurPass, GpuContext, GpuError, KernelError};
pub use pipeline::{
    BlurControl, ConfigError, DropReason, FramePipeline, FrameReport, FrameStage, PipelineConfig,
    PipelineError, RenderOutcome, StatsSnapshot,
};
pub use surface::{
    OffscreenSurface, OutputSurface, PresentationSurface, SurfaceError, WindowSurface,
};
