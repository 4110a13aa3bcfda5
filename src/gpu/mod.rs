//! GPU plumbing using wgpu.
//!
//! Device bootstrap, shader compilation, bind group layouts, texture
//! helpers, and the per-frame compute kernels.

pub mod compute;
pub mod context;
pub mod layouts;
pub mod shader;
pub mod textures;

pub use compute::{
    BlurError, BlurPass, BlurStage, ConversionKernel, DispatchGeometry, GaussianKernel,
};
pub use context::{GpuContext, GpuError};
pub use shader::KernelError;
pub use textures::{ReadbackBuffer, ReadbackError, RenderTarget};
