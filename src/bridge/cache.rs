//! Bounded pool of plane texture pairs.

use crate::frame::{chroma_dimensions, PlaneFormat};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use wgpu::{Device, Texture, TextureView};

use super::BridgeError;

/// Pairs alive at once: one being written, one pending, one in flight.
pub const TEXTURE_CACHE_CAPACITY: usize = 3;

/// GPU-visible read-only view of one plane.
pub struct PlaneTexture {
    texture: Texture,
    view: TextureView,
    format: PlaneFormat,
}

impl PlaneTexture {
    fn new(device: &Device, label: &str, width: u32, height: u32, format: PlaneFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: format.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            format,
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn format(&self) -> PlaneFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }
}

struct TexturePair {
    luma: PlaneTexture,
    chroma: PlaneTexture,
}

impl TexturePair {
    fn luma_size(&self) -> (u32, u32) {
        (self.luma.width(), self.luma.height())
    }
}

struct CacheState {
    free: Vec<TexturePair>,
    outstanding: usize,
    allocated: usize,
}

/// One cache serving both planes of every frame.
///
/// Never holds more than `capacity` pairs, pooled or leased.
pub struct TextureCache {
    device: Arc<Device>,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl TextureCache {
    pub fn new(device: Arc<Device>, capacity: usize) -> Self {
        Self {
            device,
            capacity,
            state: Mutex::new(CacheState {
                free: Vec::with_capacity(capacity),
                outstanding: 0,
                allocated: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Leases currently alive.
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// Pairs currently allocated (pooled + leased).
    pub fn allocated(&self) -> usize {
        self.lock().allocated
    }

    /// Lease a texture pair for a frame whose luma plane is `width × height`.
    pub fn acquire(
        self: &Arc<Self>,
        width: u32,
        height: u32,
    ) -> Result<PlaneTextures, BridgeError> {
        let mut state = self.lock();

        let pair = if let Some(i) = state
            .free
            .iter()
            .position(|pair| pair.luma_size() == (width, height))
        {
            state.free.swap_remove(i)
        } else {
            if state.allocated == self.capacity {
                // Evict an idle pair of another size to make room
                if state.free.pop().is_none() {
                    return Err(BridgeError::CacheExhausted {
                        capacity: self.capacity,
                    });
                }
                state.allocated -= 1;
            }
            state.allocated += 1;
            log::debug!("Allocating plane textures for {}x{} frames", width, height);
            self.allocate(width, height)
        };

        state.outstanding += 1;
        Ok(PlaneTextures {
            pair: Some(pair),
            cache: Arc::clone(self),
            timestamp: None,
        })
    }

    fn allocate(&self, width: u32, height: u32) -> TexturePair {
        let (chroma_width, chroma_height) = chroma_dimensions(width, height);
        TexturePair {
            luma: PlaneTexture::new(&self.device, "luma_plane", width, height, PlaneFormat::Luma8),
            chroma: PlaneTexture::new(
                &self.device,
                "chroma_plane",
                chroma_width,
                chroma_height,
                PlaneFormat::ChromaPair8,
            ),
        }
    }

    fn release(&self, pair: TexturePair) {
        let mut state = self.lock();
        state.outstanding -= 1;
        state.free.push(pair);
    }
}

/// Leased luma/chroma textures for one frame.
///
/// Dropping the lease returns both textures to the cache.
pub struct PlaneTextures {
    pair: Option<TexturePair>,
    cache: Arc<TextureCache>,
    timestamp: Option<Duration>,
}

impl PlaneTextures {
    fn pair(&self) -> &TexturePair {
        // Only `Drop` empties the option
        self.pair.as_ref().unwrap_or_else(|| unreachable!())
    }

    pub fn luma(&self) -> &PlaneTexture {
        &self.pair().luma
    }

    pub fn chroma(&self) -> &PlaneTexture {
        &self.pair().chroma
    }

    /// Capture timestamp of the frame these textures hold.
    pub fn timestamp(&self) -> Option<Duration> {
        self.timestamp
    }

    pub(crate) fn set_timestamp(&mut self, timestamp: Option<Duration>) {
        self.timestamp = timestamp;
    }
}

impl Drop for PlaneTextures {
    fn drop(&mut self) {
        if let Some(pair) = self.pair.take() {
            self.cache.release(pair);
        }
    }
}
