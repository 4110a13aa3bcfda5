//! Texture bridge: exposes a frame's luma and chroma planes to the GPU.
//!
//! Each plane is handed to the queue straight from the frame's own backing
//! memory, using the plane's own row pitch. The crate makes no copy of its
//! own and never repacks rows; wgpu stages the bytes internally on the way
//! to the texture. The destination textures are leased from a
//! single [`TextureCache`] shared by both planes. A lease ([`PlaneTextures`])
//! returns its textures to the cache when dropped, on every exit path.

mod cache;

pub use cache::{PlaneTexture, PlaneTextures, TextureCache, TEXTURE_CACHE_CAPACITY};

use crate::frame::{chroma_dimensions, FrameBuffer, Plane, PlaneFormat};
use std::sync::Arc;
use wgpu::{Device, Queue};

/// Reasons a frame cannot be wrapped as plane textures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("Frame has no plane {0}")]
    MissingPlane(usize),
    #[error("Plane {index} has format {found:?}, expected {expected:?}")]
    WrongFormat {
        index: usize,
        expected: PlaneFormat,
        found: PlaneFormat,
    },
    #[error("Plane {0} has a zero dimension")]
    EmptyPlane(usize),
    #[error("Chroma plane is {chroma:?}, expected {expected:?} for luma {luma:?}")]
    ChromaMismatch {
        luma: (u32, u32),
        chroma: (u32, u32),
        expected: (u32, u32),
    },
    #[error("Plane {index} row pitch {bytes_per_row} is shorter than its {row_bytes} pixel bytes")]
    StrideTooSmall {
        index: usize,
        bytes_per_row: u32,
        row_bytes: u32,
    },
    #[error("Plane {index} holds {len} bytes, geometry needs {required}")]
    TruncatedPlane {
        index: usize,
        len: usize,
        required: usize,
    },
    #[error("Plane {index} is {width}x{height}, device limit is {max}")]
    TooLarge {
        index: usize,
        width: u32,
        height: u32,
        max: u32,
    },
    #[error("All {capacity} plane texture pairs are in use")]
    CacheExhausted { capacity: usize },
}

fn checked_plane<'a>(
    frame: &'a dyn FrameBuffer,
    index: usize,
    expected: PlaneFormat,
    max_dimension: u32,
) -> Result<Plane<'a>, BridgeError> {
    let plane = frame.plane(index).ok_or(BridgeError::MissingPlane(index))?;

    if plane.format != expected {
        return Err(BridgeError::WrongFormat {
            index,
            expected,
            found: plane.format,
        });
    }
    if plane.width == 0 || plane.height == 0 {
        return Err(BridgeError::EmptyPlane(index));
    }
    if plane.width > max_dimension || plane.height > max_dimension {
        return Err(BridgeError::TooLarge {
            index,
            width: plane.width,
            height: plane.height,
            max: max_dimension,
        });
    }
    if plane.bytes_per_row < plane.row_bytes() {
        return Err(BridgeError::StrideTooSmall {
            index,
            bytes_per_row: plane.bytes_per_row,
            row_bytes: plane.row_bytes(),
        });
    }
    if plane.data.len() < plane.required_len() {
        return Err(BridgeError::TruncatedPlane {
            index,
            len: plane.data.len(),
            required: plane.required_len(),
        });
    }

    Ok(plane)
}

/// Check that a frame is a well-formed biplanar 4:2:0 frame.
///
/// Returns the (luma, chroma) planes on success. Runs before any GPU work,
/// so a rejected frame never acquires textures.
pub fn validate_planes(
    frame: &dyn FrameBuffer,
    max_dimension: u32,
) -> Result<(Plane<'_>, Plane<'_>), BridgeError> {
    if frame.plane_count() < 2 {
        return Err(BridgeError::MissingPlane(frame.plane_count()));
    }

    let luma = checked_plane(frame, 0, PlaneFormat::Luma8, max_dimension)?;
    let chroma = checked_plane(frame, 1, PlaneFormat::ChromaPair8, max_dimension)?;

    let expected = chroma_dimensions(luma.width, luma.height);
    if (chroma.width, chroma.height) != expected {
        return Err(BridgeError::ChromaMismatch {
            luma: (luma.width, luma.height),
            chroma: (chroma.width, chroma.height),
            expected,
        });
    }

    Ok((luma, chroma))
}

/// Wraps incoming frames as GPU plane textures.
pub struct TextureBridge {
    queue: Arc<Queue>,
    cache: Arc<TextureCache>,
    max_dimension: u32,
}

impl TextureBridge {
    /// Create a bridge with one texture cache for both planes.
    pub fn new(device: Arc<Device>, queue: Arc<Queue>) -> Self {
        let max_dimension = device.limits().max_texture_dimension_2d;
        Self {
            queue,
            cache: Arc::new(TextureCache::new(device, TEXTURE_CACHE_CAPACITY)),
            max_dimension,
        }
    }

    pub fn cache(&self) -> &Arc<TextureCache> {
        &self.cache
    }

    /// Produce luma (R8Unorm) and chroma (Rg8Unorm) textures for `frame`.
    ///
    /// The frame is only borrowed for the duration of this call.
    pub fn wrap(&self, frame: &dyn FrameBuffer) -> Result<PlaneTextures, BridgeError> {
        let (luma, chroma) = validate_planes(frame, self.max_dimension)?;

        let mut lease = self.cache.acquire(luma.width, luma.height)?;
        lease.set_timestamp(frame.timestamp());

        self.write_plane(lease.luma(), &luma);
        self.write_plane(lease.chroma(), &chroma);

        log::trace!(
            "Wrapped {}x{} frame ({} pairs outstanding)",
            luma.width,
            luma.height,
            self.cache.outstanding()
        );

        Ok(lease)
    }

    fn write_plane(&self, target: &PlaneTexture, plane: &Plane<'_>) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: target.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            plane.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(plane.bytes_per_row),
                rows_per_image: Some(plane.height),
            },
            wgpu::Extent3d {
                width: plane.width,
                height: plane.height,
                depth_or_array_layers: 1,
            },
        );
    }
}
