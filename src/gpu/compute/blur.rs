//! Separable Gaussian blur applied in place on the output texture.
//!
//! The horizontal pass reads the output and writes a half-float scratch
//! texture; the vertical pass reads the scratch and writes back into the
//! output. Both passes share one weight buffer, rebuilt only when σ changes.

use std::sync::Arc;
use wgpu::{
    BindGroupLayout, Buffer, CommandEncoder, ComputePipeline, Device, Queue, TextureFormat,
    TextureView,
};

use super::dispatch::DispatchGeometry;
use super::params::BlurParams;
use crate::gpu::layouts::create_blur_layout;
use crate::gpu::shader::{
    compile_wgsl, create_compute_pipeline, storage_format_name, KernelError, ShaderTemplate,
    GAUSSIAN_BLUR_WGSL,
};
use crate::gpu::textures::RenderTarget;

/// σ below this is treated as no blur at all.
pub const MIN_EFFECTIVE_SIGMA: f32 = 0.01;

/// Largest supported kernel radius (3σ at σ = 50).
pub const MAX_KERNEL_RADIUS: u32 = 150;

const SCRATCH_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

const BLUR_SHADER: ShaderTemplate = ShaderTemplate::new("gaussian_blur", GAUSSIAN_BLUR_WGSL);

/// Errors raised while building a blur filter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlurError {
    #[error("Blur sigma must be finite and non-negative, got {0}")]
    InvalidSigma(f32),
    #[error("Kernel radius {radius} exceeds the maximum of {max}")]
    RadiusTooLarge { radius: u32, max: u32 },
}

/// One-sided Gaussian weights for a given σ.
///
/// `weights()[0]` is the center tap and `weights()[i]` the tap at distance
/// `i` on either side, normalized so the full kernel sums to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    sigma: f32,
    weights: Vec<f32>,
}

impl GaussianKernel {
    pub fn new(sigma: f32) -> Result<Self, BlurError> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(BlurError::InvalidSigma(sigma));
        }
        if sigma < MIN_EFFECTIVE_SIGMA {
            return Ok(Self {
                sigma,
                ..Self::identity()
            });
        }

        let radius = (3.0 * sigma).ceil() as u32;
        if radius > MAX_KERNEL_RADIUS {
            return Err(BlurError::RadiusTooLarge {
                radius,
                max: MAX_KERNEL_RADIUS,
            });
        }

        let two_sigma_sq = 2.0 * sigma * sigma;
        let mut weights: Vec<f32> = (0..=radius)
            .map(|i| (-((i * i) as f32) / two_sigma_sq).exp())
            .collect();
        let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
        for w in &mut weights {
            *w /= total;
        }

        Ok(Self { sigma, weights })
    }

    fn identity() -> Self {
        Self {
            sigma: 0.0,
            weights: vec![1.0],
        }
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    pub fn radius(&self) -> u32 {
        (self.weights.len() - 1) as u32
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// True when the kernel leaves every pixel untouched.
    pub fn is_identity(&self) -> bool {
        self.weights.len() == 1
    }

    /// Convolve one row on the CPU with edge clamping, as each GPU pass does.
    pub fn apply_1d(&self, row: &[f32]) -> Vec<f32> {
        if row.is_empty() {
            return Vec::new();
        }
        let last = row.len() as i64 - 1;
        let at = |i: i64| row[i.clamp(0, last) as usize];

        (0..row.len() as i64)
            .map(|x| {
                let mut sum = at(x) * self.weights[0];
                for (i, w) in self.weights.iter().enumerate().skip(1) {
                    let i = i as i64;
                    sum += (at(x + i) + at(x - i)) * w;
                }
                sum
            })
            .collect()
    }
}

/// What the blur stage recorded for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurPass {
    /// σ was effectively zero; no passes were encoded.
    Identity,
    /// Both passes were encoded with this kernel radius.
    Applied { radius: u32 },
    /// The filter could not be built for the requested σ; conversion output
    /// is presented unblurred.
    Skipped,
}

/// Weights uploaded for the current σ. `None` for the identity kernel.
struct CompiledFilter {
    kernel: GaussianKernel,
    weights: Option<Buffer>,
}

enum FilterState {
    Ready(CompiledFilter),
    Failed { sigma: f32 },
}

struct BlurDirection {
    pipeline: ComputePipeline,
    layout: BindGroupLayout,
    params: Buffer,
}

impl BlurDirection {
    fn new(
        device: &Device,
        geometry: DispatchGeometry,
        label: &'static str,
        destination_format: TextureFormat,
    ) -> Result<Self, KernelError> {
        let source = BLUR_SHADER.render(&[
            ("WORKGROUP_SIZE", geometry.workgroup_size().to_string()),
            (
                "OUTPUT_FORMAT",
                storage_format_name(destination_format)?.to_string(),
            ),
        ])?;
        let module = compile_wgsl(device, label, &source)?;
        let layout = create_blur_layout(device, label, destination_format);
        let pipeline = create_compute_pipeline(device, label, &module, &layout, "blur");

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<BlurParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            pipeline,
            layout,
            params,
        })
    }

    fn encode(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        geometry: &DispatchGeometry,
        source: &TextureView,
        destination: &TextureView,
        weights: &Buffer,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gaussian_blur_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(destination),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: weights.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.params.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("gaussian_blur_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        geometry.dispatch(&mut pass);
    }
}

/// In-place blur with a lazily rebuilt filter.
pub struct BlurStage {
    device: Arc<Device>,
    queue: Arc<Queue>,
    geometry: DispatchGeometry,
    horizontal: BlurDirection,
    vertical: BlurDirection,
    scratch: RenderTarget,
    filter: FilterState,
    rebuilds: u64,
}

impl BlurStage {
    /// Build both passes. The filter starts as the identity (σ = 0).
    pub fn new(
        device: Arc<Device>,
        queue: Arc<Queue>,
        geometry: DispatchGeometry,
        output_format: TextureFormat,
    ) -> Result<Self, KernelError> {
        let horizontal =
            BlurDirection::new(&device, geometry, "gaussian_blur_horizontal", SCRATCH_FORMAT)?;
        let vertical =
            BlurDirection::new(&device, geometry, "gaussian_blur_vertical", output_format)?;
        let scratch = RenderTarget::for_scratch(
            &device,
            "gaussian_blur_scratch",
            geometry.width(),
            geometry.height(),
            SCRATCH_FORMAT,
        );

        Ok(Self {
            device,
            queue,
            geometry,
            horizontal,
            vertical,
            scratch,
            filter: FilterState::Ready(CompiledFilter {
                kernel: GaussianKernel::identity(),
                weights: None,
            }),
            rebuilds: 0,
        })
    }

    /// σ the current (or last attempted) filter was built for.
    pub fn sigma(&self) -> f32 {
        match &self.filter {
            FilterState::Ready(filter) => filter.kernel.sigma(),
            FilterState::Failed { sigma } => *sigma,
        }
    }

    /// Number of filters built since construction. Failed attempts do not count.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Point the filter at `sigma`, rebuilding only if it changed.
    ///
    /// Returns whether a rebuild happened. On error the stage skips the
    /// blur until a buildable σ arrives.
    pub fn set_sigma(&mut self, sigma: f32) -> Result<bool, BlurError> {
        if sigma == self.sigma() {
            return Ok(false);
        }

        let kernel = match GaussianKernel::new(sigma) {
            Ok(kernel) => kernel,
            Err(e) => {
                self.filter = FilterState::Failed { sigma };
                return Err(e);
            }
        };
        self.rebuilds += 1;

        let weights = if kernel.is_identity() {
            None
        } else {
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("gaussian_blur_weights"),
                size: std::mem::size_of_val(kernel.weights()) as u64,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.queue
                .write_buffer(&buffer, 0, bytemuck::cast_slice(kernel.weights()));

            let (width, height) = (self.geometry.width(), self.geometry.height());
            let radius = kernel.radius();
            self.queue.write_buffer(
                &self.horizontal.params,
                0,
                bytemuck::bytes_of(&BlurParams::new(width, height, radius, true)),
            );
            self.queue.write_buffer(
                &self.vertical.params,
                0,
                bytemuck::bytes_of(&BlurParams::new(width, height, radius, false)),
            );
            Some(buffer)
        };

        log::debug!("Blur filter rebuilt: sigma={} radius={}", sigma, kernel.radius());
        self.filter = FilterState::Ready(CompiledFilter { kernel, weights });
        Ok(true)
    }

    /// Record the blur of `target` in place.
    pub fn encode(&self, encoder: &mut CommandEncoder, target: &TextureView) -> BlurPass {
        let filter = match &self.filter {
            FilterState::Ready(filter) => filter,
            FilterState::Failed { .. } => return BlurPass::Skipped,
        };
        let weights = match &filter.weights {
            Some(weights) => weights,
            None => return BlurPass::Identity,
        };

        self.horizontal.encode(
            &self.device,
            encoder,
            &self.geometry,
            target,
            self.scratch.view(),
            weights,
        );
        self.vertical.encode(
            &self.device,
            encoder,
            &self.geometry,
            self.scratch.view(),
            target,
            weights,
        );

        BlurPass::Applied {
            radius: filter.kernel.radius(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variance(values: &[f32]) -> f32 {
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32
    }

    #[test]
    fn test_weights_are_normalized() {
        for sigma in [0.5, 1.0, 3.7, 50.0] {
            let kernel = GaussianKernel::new(sigma).unwrap();
            let w = kernel.weights();
            let total = w[0] + 2.0 * w[1..].iter().sum::<f32>();
            assert!((total - 1.0).abs() < 1e-5, "sigma {}: sum {}", sigma, total);
        }
    }

    #[test]
    fn test_radius_is_three_sigma() {
        assert_eq!(GaussianKernel::new(1.0).unwrap().radius(), 3);
        assert_eq!(GaussianKernel::new(2.5).unwrap().radius(), 8);
        assert_eq!(GaussianKernel::new(50.0).unwrap().radius(), MAX_KERNEL_RADIUS);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let kernel = GaussianKernel::new(0.0).unwrap();
        assert!(kernel.is_identity());

        let row = [0.0, 1.0, 0.25, 0.75];
        assert_eq!(kernel.apply_1d(&row), row.to_vec());
    }

    #[test]
    fn test_invalid_sigma_rejected() {
        assert!(matches!(
            GaussianKernel::new(-1.0),
            Err(BlurError::InvalidSigma(_))
        ));
        assert!(matches!(
            GaussianKernel::new(f32::NAN),
            Err(BlurError::InvalidSigma(_))
        ));
        assert_eq!(
            GaussianKernel::new(51.0),
            Err(BlurError::RadiusTooLarge { radius: 153, max: 150 })
        );
    }

    #[test]
    fn test_weights_decrease_from_center() {
        let kernel = GaussianKernel::new(2.0).unwrap();
        assert!(kernel.weights().windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_variance_non_increasing_in_sigma() {
        // Square wave with period 8, measured away from the clamped edges
        let row: Vec<f32> = (0..256).map(|i| if i % 8 < 4 { 1.0 } else { 0.0 }).collect();
        let interior = 64..192;

        let mut previous = variance(&row[interior.clone()]);
        for sigma in [0.5, 1.0, 2.0, 4.0] {
            let blurred = GaussianKernel::new(sigma).unwrap().apply_1d(&row);
            let v = variance(&blurred[interior.clone()]);
            assert!(v <= previous + 1e-7, "sigma {}: {} > {}", sigma, v, previous);
            previous = v;
        }
    }

    #[test]
    fn test_flat_row_is_preserved() {
        let kernel = GaussianKernel::new(3.0).unwrap();
        for v in kernel.apply_1d(&[0.4; 20]) {
            assert!((v - 0.4).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_rebuild_only_on_change() {
        let ctx = match crate::gpu::GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let mut stage = BlurStage::new(
            ctx.device.clone(),
            ctx.queue.clone(),
            DispatchGeometry::new(32, 32, 16),
            TextureFormat::Rgba8Unorm,
        )
        .unwrap();
        assert_eq!(stage.rebuild_count(), 0);

        assert!(!stage.set_sigma(0.0).unwrap());
        assert!(stage.set_sigma(2.0).unwrap());
        assert!(!stage.set_sigma(2.0).unwrap());
        assert_eq!(stage.rebuild_count(), 1);
        assert_eq!(stage.sigma(), 2.0);
    }

    #[tokio::test]
    async fn test_failed_rebuild_skips_blur() {
        let ctx = match crate::gpu::GpuContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let mut stage = BlurStage::new(
            ctx.device.clone(),
            ctx.queue.clone(),
            DispatchGeometry::new(32, 32, 16),
            TextureFormat::Rgba8Unorm,
        )
        .unwrap();
        let target =
            RenderTarget::for_output(&ctx.device, "target", 32, 32, TextureFormat::Rgba8Unorm);
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        assert_eq!(stage.encode(&mut encoder, target.view()), BlurPass::Identity);

        assert!(stage.set_sigma(80.0).is_err());
        assert_eq!(stage.encode(&mut encoder, target.view()), BlurPass::Skipped);
        assert_eq!(stage.rebuild_count(), 0);

        // Same σ again stays skipped without another attempt
        assert!(!stage.set_sigma(80.0).unwrap());
        assert_eq!(stage.encode(&mut encoder, target.view()), BlurPass::Skipped);

        stage.set_sigma(1.0).unwrap();
        assert_eq!(stage.rebuild_count(), 1);
        assert_eq!(
            stage.encode(&mut encoder, target.view()),
            BlurPass::Applied { radius: 3 }
        );
        ctx.queue.submit(Some(encoder.finish()));
    }
}
