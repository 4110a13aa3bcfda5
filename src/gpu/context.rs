//! GPU context initialization and management.

use std::sync::Arc;
use wgpu::{Adapter, Device, Instance, Queue};

/// Errors that can occur during GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("Surface cannot be used as a compute storage target (usages: {0:?})")]
    SurfaceNotWritable(wgpu::TextureUsages),
    #[error("Surface offers no storage-capable format (offered: {0:?})")]
    NoStorageFormat(Vec<wgpu::TextureFormat>),
}

/// GPU context holding device and queue for the frame pipeline.
///
/// Cloning is cheap: all handles are shared.
#[derive(Clone)]
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
}

impl GpuContext {
    /// Create a new GPU context for headless use.
    ///
    /// Prefers Metal on macOS, falls back to other backends.
    pub async fn new() -> Result<Self, GpuError> {
        Self::with_instance(Self::default_instance(), None).await
    }

    /// Create a GPU context whose adapter can present to `surface`.
    ///
    /// The surface must have been created from `instance`.
    pub async fn for_surface(
        instance: Instance,
        surface: &wgpu::Surface<'_>,
    ) -> Result<Self, GpuError> {
        Self::with_instance(instance, Some(surface)).await
    }

    /// The instance configuration used by [`GpuContext::new`].
    pub fn default_instance() -> Instance {
        Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::METAL | wgpu::Backends::VULKAN | wgpu::Backends::GL,
            ..Default::default()
        })
    }

    async fn with_instance(
        instance: Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        // Drawables are often BGRA; writing them from a compute kernel needs this.
        let required_features = adapter.features() & wgpu::Features::BGRA8UNORM_STORAGE;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("ycbcr-blur"),
                required_features,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let info = adapter.get_info();
        log::info!(
            "GPU device created: {} ({:?}), bgra storage: {}",
            info.name,
            info.backend,
            !required_features.is_empty()
        );

        Ok(Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Get info about the GPU adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Limits of the created device.
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Whether a compute kernel can write `format` through a storage binding.
    pub fn supports_storage_format(&self, format: wgpu::TextureFormat) -> bool {
        match format {
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba16Float => true,
            wgpu::TextureFormat::Bgra8Unorm => self
                .device
                .features()
                .contains(wgpu::Features::BGRA8UNORM_STORAGE),
            _ => false,
        }
    }
}
