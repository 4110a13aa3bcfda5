//! Window-backed presentation.

use std::sync::Arc;
use wgpu::{Device, TextureFormat, TextureUsages};

use super::{OutputSurface, PresentationSurface, SurfaceError};
use crate::gpu::{GpuContext, GpuError};

/// Formats a drawable may use, in order of preference.
const PREFERRED_FORMATS: [TextureFormat; 2] = [TextureFormat::Rgba8Unorm, TextureFormat::Bgra8Unorm];

/// A swapchain the compute kernels write into directly.
pub struct WindowSurface {
    device: Arc<Device>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl WindowSurface {
    /// Configure `surface` at `width × height` with `buffers` drawables.
    ///
    /// Fails if the surface cannot be bound as a storage texture in any
    /// format the device can write.
    pub fn new(
        ctx: &GpuContext,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        buffers: u32,
    ) -> Result<Self, GpuError> {
        let caps = surface.get_capabilities(&ctx.adapter);

        let required = TextureUsages::STORAGE_BINDING | TextureUsages::TEXTURE_BINDING;
        if !caps.usages.contains(required) {
            return Err(GpuError::SurfaceNotWritable(caps.usages));
        }

        let format = PREFERRED_FORMATS
            .into_iter()
            .find(|f| caps.formats.contains(f) && ctx.supports_storage_format(*f))
            .ok_or_else(|| GpuError::NoStorageFormat(caps.formats.clone()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: required | TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: buffers.saturating_sub(1).max(1),
        };
        surface.configure(&ctx.device, &config);

        log::info!(
            "Window surface configured: {}x{} {:?}, {} buffers",
            width,
            height,
            format,
            buffers
        );

        Ok(Self {
            device: ctx.device.clone(),
            surface,
            config,
        })
    }

    fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}

impl PresentationSurface for WindowSurface {
    fn format(&self) -> TextureFormat {
        self.config.format
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn acquire(&mut self) -> Result<OutputSurface, SurfaceError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(OutputSurface::from_surface_texture(frame)),
            Err(wgpu::SurfaceError::Timeout) => Err(SurfaceError::Timeout),
            Err(wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface outdated, reconfiguring");
                self.reconfigure();
                Err(SurfaceError::Outdated)
            }
            Err(wgpu::SurfaceError::Lost) => {
                log::debug!("Surface lost, reconfiguring");
                self.reconfigure();
                Err(SurfaceError::Lost)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(SurfaceError::OutOfMemory),
            Err(e) => Err(SurfaceError::Other(e.to_string())),
        }
    }

    fn present(&mut self, mut output: OutputSurface) {
        match output.take_surface_texture() {
            Some(frame) => frame.present(),
            None => log::warn!("Drawable was not acquired from this window surface"),
        }
    }
}
