//! YCbCr 4:2:0 → RGB conversion kernel.

use wgpu::{
    BindGroupLayout, Buffer, CommandEncoder, ComputePipeline, Device, Queue, TextureFormat,
    TextureView,
};

use super::dispatch::DispatchGeometry;
use super::params::ConvertParams;
use crate::bridge::PlaneTextures;
use crate::color::ColorRange;
use crate::gpu::layouts::create_convert_layout;
use crate::gpu::shader::{
    compile_wgsl, create_compute_pipeline, storage_format_name, KernelError, ShaderTemplate,
    YCBCR_CONVERT_WGSL,
};

const CONVERT_SHADER: ShaderTemplate = ShaderTemplate::new("ycbcr_convert", YCBCR_CONVERT_WGSL);

/// Compiled conversion program plus its fixed parameters.
///
/// Built once at startup. Writes straight into the output texture, one
/// invocation per pixel.
pub struct ConversionKernel {
    pipeline: ComputePipeline,
    layout: BindGroupLayout,
    params_buffer: Buffer,
    geometry: DispatchGeometry,
    output_format: TextureFormat,
}

impl ConversionKernel {
    pub fn new(
        device: &Device,
        queue: &Queue,
        geometry: DispatchGeometry,
        output_format: TextureFormat,
        range: ColorRange,
    ) -> Result<Self, KernelError> {
        let source = CONVERT_SHADER.render(&[
            ("WORKGROUP_SIZE", geometry.workgroup_size().to_string()),
            (
                "OUTPUT_FORMAT",
                storage_format_name(output_format)?.to_string(),
            ),
        ])?;
        let module = compile_wgsl(device, CONVERT_SHADER.label(), &source)?;

        let layout = create_convert_layout(device, output_format);
        let pipeline =
            create_compute_pipeline(device, CONVERT_SHADER.label(), &module, &layout, "convert");

        let params = ConvertParams::new(geometry.width(), geometry.height(), range);
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ycbcr_convert_params"),
            size: std::mem::size_of::<ConvertParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

        Ok(Self {
            pipeline,
            layout,
            params_buffer,
            geometry,
            output_format,
        })
    }

    pub fn geometry(&self) -> DispatchGeometry {
        self.geometry
    }

    pub fn output_format(&self) -> TextureFormat {
        self.output_format
    }

    /// Record the conversion of `planes` into `output`.
    pub fn encode(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        planes: &PlaneTextures,
        output: &TextureView,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ycbcr_convert_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(planes.luma().view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(planes.chroma().view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(output),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("ycbcr_convert_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        self.geometry.dispatch(&mut pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;

    #[tokio::test]
    async fn test_kernel_builds_for_rgba() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let kernel = ConversionKernel::new(
            &ctx.device,
            &ctx.queue,
            DispatchGeometry::new(64, 48, 16),
            TextureFormat::Rgba8Unorm,
            ColorRange::Full,
        )
        .unwrap();
        assert_eq!(kernel.geometry().workgroups(), (4, 3));
    }

    #[tokio::test]
    async fn test_kernel_rejects_non_storage_format() {
        let ctx = match GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let result = ConversionKernel::new(
            &ctx.device,
            &ctx.queue,
            DispatchGeometry::new(64, 48, 16),
            TextureFormat::Rgba8UnormSrgb,
            ColorRange::Full,
        );
        assert!(matches!(
            result,
            Err(KernelError::UnsupportedStorageFormat(_))
        ));
    }
}
