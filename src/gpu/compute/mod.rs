//! Per-frame compute kernels.
//!
//! Conversion writes the drawable from the plane textures; the blur then
//! filters that drawable in place. Both dispatch over the same fixed grid.

mod dispatch;
mod params;

pub mod blur;
pub mod convert;

pub use blur::{BlurError, BlurPass, BlurStage, GaussianKernel, MAX_KERNEL_RADIUS, MIN_EFFECTIVE_SIGMA};
pub use convert::ConversionKernel;
pub use dispatch::DispatchGeometry;
pub use params::{BlurParams, ConvertParams};
