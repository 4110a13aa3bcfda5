//! Presentation surfaces.
//!
//! This module provides:
//! - The `PresentationSurface` contract the orchestrator renders into
//! - `WindowSurface` over a host-created `wgpu::Surface`
//! - `OffscreenSurface`, a headless ring of drawables for tests and demos

mod offscreen;
mod window;

pub use offscreen::OffscreenSurface;
pub use window::WindowSurface;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wgpu::{SurfaceTexture, Texture, TextureFormat, TextureView};

/// Reasons a drawable cannot be obtained this cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("Display is not ready for another frame")]
    NotReady,
    #[error("Timed out waiting for a drawable")]
    Timeout,
    #[error("Surface is outdated and was reconfigured")]
    Outdated,
    #[error("Surface was lost and was reconfigured")]
    Lost,
    #[error("Out of memory acquiring a drawable")]
    OutOfMemory,
    #[error("Surface error: {0}")]
    Other(String),
}

/// The drawable for one frame.
///
/// Move-only: [`PresentationSurface::present`] consumes it, so each
/// acquisition is presented at most once and never shared between frames.
/// Dropping it unpresented discards the drawable.
#[derive(Debug)]
pub struct OutputSurface {
    texture: Texture,
    view: TextureView,
    frame: Option<SurfaceTexture>,
    slot: usize,
    busy: Option<Arc<AtomicBool>>,
}

impl OutputSurface {
    /// Wrap a texture owned by a custom surface implementation.
    ///
    /// The texture needs `STORAGE_BINDING | TEXTURE_BINDING` usage.
    pub fn new(texture: Texture, slot: usize) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            frame: None,
            slot,
            busy: None,
        }
    }

    /// Clear `busy` when this drawable is presented or discarded.
    pub(crate) fn with_busy_flag(mut self, busy: Arc<AtomicBool>) -> Self {
        self.busy = Some(busy);
        self
    }

    pub(crate) fn from_surface_texture(frame: SurfaceTexture) -> Self {
        let texture = frame.texture.clone();
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            frame: Some(frame),
            slot: 0,
            busy: None,
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    /// Index of the backing buffer within its surface's ring.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    pub(crate) fn take_surface_texture(&mut self) -> Option<SurfaceTexture> {
        self.frame.take()
    }
}

impl Drop for OutputSurface {
    fn drop(&mut self) {
        if let Some(busy) = &self.busy {
            busy.store(false, Ordering::Release);
        }
    }
}

/// A display-backed render target, double or triple buffered.
pub trait PresentationSurface: Send {
    /// Storage format the conversion kernel writes.
    fn format(&self) -> TextureFormat;

    /// Drawable size in pixels.
    fn size(&self) -> (u32, u32);

    /// Next drawable, exclusive to the caller until presented.
    fn acquire(&mut self) -> Result<OutputSurface, SurfaceError>;

    /// Schedule `output` for display. Called after the frame's commands
    /// have been submitted.
    fn present(&mut self, output: OutputSurface);
}
