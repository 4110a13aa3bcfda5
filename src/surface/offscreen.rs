//! Headless presentation into a ring of textures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wgpu::{Device, Queue, TextureFormat};

use super::{OutputSurface, PresentationSurface, SurfaceError};
use crate::gpu::textures::{ReadbackBuffer, ReadbackError, RenderTarget};
use crate::gpu::{GpuContext, GpuError};

/// Double or triple buffered drawables with no display attached.
///
/// "Presenting" records which buffer holds the newest image so it can be
/// read back.
pub struct OffscreenSurface {
    device: Arc<Device>,
    queue: Arc<Queue>,
    format: TextureFormat,
    width: u32,
    height: u32,
    buffers: Vec<RenderTarget>,
    busy: Vec<Arc<AtomicBool>>,
    next: usize,
    available: bool,
    last_presented: Option<usize>,
    present_count: u64,
}

impl OffscreenSurface {
    pub fn new(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        format: TextureFormat,
        buffers: usize,
    ) -> Result<Self, GpuError> {
        if !ctx.supports_storage_format(format) {
            return Err(GpuError::NoStorageFormat(vec![format]));
        }

        let buffers: Vec<RenderTarget> = (0..buffers.max(1))
            .map(|_| RenderTarget::for_output(&ctx.device, "offscreen_drawable", width, height, format))
            .collect();

        Ok(Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            format,
            width,
            height,
            busy: (0..buffers.len())
                .map(|_| Arc::new(AtomicBool::new(false)))
                .collect(),
            buffers,
            next: 0,
            available: true,
            last_presented: None,
            present_count: 0,
        })
    }

    /// Simulate a display that has (or has no) drawable ready.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn present_count(&self) -> u64 {
        self.present_count
    }

    pub fn last_presented(&self) -> Option<usize> {
        self.last_presented
    }

    /// Read the most recently presented image as RGBA8.
    ///
    /// Blocks until the GPU is idle. `None` if nothing was presented yet.
    pub fn read_presented(&self) -> Result<Option<Vec<u8>>, ReadbackError> {
        let slot = match self.last_presented {
            Some(slot) => slot,
            None => return Ok(None),
        };

        let readback = ReadbackBuffer::new(&self.device, self.width, self.height);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("offscreen_readback_encoder"),
            });
        readback.encode_copy(&mut encoder, self.buffers[slot].texture());
        self.queue.submit(Some(encoder.finish()));

        readback.read_rgba(&self.device, self.format).map(Some)
    }
}

impl PresentationSurface for OffscreenSurface {
    fn format(&self) -> TextureFormat {
        self.format
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn acquire(&mut self) -> Result<OutputSurface, SurfaceError> {
        if !self.available {
            return Err(SurfaceError::NotReady);
        }

        let count = self.buffers.len();
        let slot = (0..count)
            .map(|i| (self.next + i) % count)
            .find(|&slot| !self.busy[slot].load(Ordering::Acquire))
            .ok_or(SurfaceError::NotReady)?;

        self.busy[slot].store(true, Ordering::Release);
        self.next = (slot + 1) % count;
        Ok(OutputSurface::new(self.buffers[slot].texture().clone(), slot)
            .with_busy_flag(Arc::clone(&self.busy[slot])))
    }

    fn present(&mut self, output: OutputSurface) {
        let slot = output.slot();
        if slot >= self.buffers.len() || !self.busy[slot].load(Ordering::Acquire) {
            log::warn!("Drawable {} was not acquired from this surface", slot);
            return;
        }
        self.last_presented = Some(slot);
        self.present_count += 1;
    }
}
