//! Bind group layout builders for the compute kernels.
//!
//! Provides reusable helpers for creating wgpu bind group layouts.

use wgpu::{BindGroupLayout, BindGroupLayoutEntry, Device, ShaderStages, TextureFormat};

/// Builder for creating bind group layouts with common patterns.
pub struct BindGroupLayoutBuilder {
    label: Option<&'static str>,
    visibility: ShaderStages,
    entries: Vec<BindGroupLayoutEntry>,
}

impl BindGroupLayoutBuilder {
    /// Create a new bind group layout builder for compute shaders.
    pub fn new(label: &'static str) -> Self {
        Self {
            label: Some(label),
            visibility: ShaderStages::COMPUTE,
            entries: Vec::new(),
        }
    }

    /// Add a uniform buffer entry.
    pub fn uniform(mut self, binding: u32) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    /// Add a read-only storage buffer entry.
    pub fn storage_read(mut self, binding: u32) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
        self
    }

    /// Add a 2D texture read with `textureLoad` (no sampler).
    pub fn texture_2d(mut self, binding: u32) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        self
    }

    /// Add a write-only 2D storage texture entry.
    pub fn storage_texture_write(mut self, binding: u32, format: TextureFormat) -> Self {
        self.entries.push(BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        });
        self
    }

    /// Build the bind group layout.
    pub fn build(self, device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: self.label,
            entries: &self.entries,
        })
    }
}

/// Create the conversion layout (luma, chroma, output storage, params).
pub fn create_convert_layout(device: &Device, output_format: TextureFormat) -> BindGroupLayout {
    BindGroupLayoutBuilder::new("ycbcr_convert_bind_group_layout")
        .texture_2d(0)
        .texture_2d(1)
        .storage_texture_write(2, output_format)
        .uniform(3)
        .build(device)
}

/// Create a blur pass layout (source, destination storage, weights, params).
pub fn create_blur_layout(
    device: &Device,
    label: &'static str,
    destination_format: TextureFormat,
) -> BindGroupLayout {
    BindGroupLayoutBuilder::new(label)
        .texture_2d(0)
        .storage_texture_write(1, destination_format)
        .storage_read(2)
        .uniform(3)
        .build(device)
}
