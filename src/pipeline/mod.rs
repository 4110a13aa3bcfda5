//! Per-frame orchestration: planes → conversion → blur → present.
//!
//! Frames arrive on the camera's delivery thread through
//! [`FramePipeline::submit_frame`]; the display cadence drives
//! [`FramePipeline::render`]. The two meet in a single-slot handoff where the
//! newest frame always wins. σ is pushed from anywhere through a
//! [`BlurControl`] and sampled once per frame when its textures are bound.

mod config;
mod sigma;
mod slot;
mod stage;
mod stats;

pub use config::{
    ConfigError, PipelineConfig, DEFAULT_SURFACE_BUFFERS, MAX_BLUR_SIGMA, THREADGROUP_SIZE,
    WORKING_HEIGHT, WORKING_WIDTH,
};
pub use sigma::{BlurControl, BlurSigma};
pub use slot::FrameSlot;
pub use stage::{FrameRun, FrameStage, StageError};
pub use stats::{PipelineStats, StatsSnapshot};

use crate::bridge::{BridgeError, PlaneTextures, TextureBridge};
use crate::gpu::compute::{
    BlurError, BlurPass, BlurStage, ConversionKernel, DispatchGeometry,
};
use crate::gpu::shader::KernelError;
use crate::gpu::{GpuContext, GpuError};
use crate::frame::FrameBuffer;
use crate::surface::{PresentationSurface, SurfaceError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use wgpu::TextureFormat;

/// Startup failures. Any of these means the pipeline cannot run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
    #[error("Blur error: {0}")]
    Blur(#[from] BlurError),
    #[error("Output format {0:?} cannot be written by the conversion kernel on this device")]
    UnsupportedOutputFormat(TextureFormat),
}

/// Why a frame was dropped. Every reason is recoverable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DropReason {
    #[error("Plane acquisition failed: {0}")]
    Acquisition(#[from] BridgeError),
    #[error("Frame is {found:?}, working resolution is {expected:?}")]
    ResolutionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("Presentation unavailable: {0}")]
    PresentationUnavailable(#[from] SurfaceError),
    #[error("Surface is {found:?}, working resolution is {expected:?}")]
    SurfaceSizeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("Surface format {found:?} does not match pipeline format {expected:?}")]
    SurfaceFormatMismatch {
        expected: TextureFormat,
        found: TextureFormat,
    },
    #[error("Invalid stage transition: {0}")]
    InvalidTransition(#[from] StageError),
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub sequence: u64,
    /// σ sampled when the frame's textures were bound.
    pub sigma: f32,
    /// `None` if the frame was dropped before the blur was encoded.
    pub blur: Option<BlurPass>,
    pub trace: Vec<FrameStage>,
    pub drop_reason: Option<DropReason>,
}

/// Result of one render cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// No frame was pending; no drawable was acquired.
    Idle,
    Presented(FrameReport),
    Dropped(FrameReport),
}

impl RenderOutcome {
    pub fn report(&self) -> Option<&FrameReport> {
        match self {
            RenderOutcome::Idle => None,
            RenderOutcome::Presented(report) | RenderOutcome::Dropped(report) => Some(report),
        }
    }

    pub fn is_presented(&self) -> bool {
        matches!(self, RenderOutcome::Presented(_))
    }
}

/// A frame whose planes are on the GPU, waiting for a drawable.
struct PendingFrame {
    run: FrameRun,
    planes: PlaneTextures,
    sigma: f32,
}

/// The per-frame GPU pipeline and everything it builds once at startup.
pub struct FramePipeline {
    ctx: GpuContext,
    config: PipelineConfig,
    output_format: TextureFormat,
    bridge: TextureBridge,
    conversion: ConversionKernel,
    blur: Mutex<BlurStage>,
    sigma: Arc<BlurSigma>,
    pending: FrameSlot<PendingFrame>,
    next_sequence: AtomicU64,
    stats: PipelineStats,
}

impl FramePipeline {
    /// Validate `config` and build every kernel for `output_format`.
    pub fn new(
        ctx: GpuContext,
        config: PipelineConfig,
        output_format: TextureFormat,
    ) -> Result<Self, PipelineError> {
        config.validate(&ctx.limits())?;
        if !ctx.supports_storage_format(output_format) {
            return Err(PipelineError::UnsupportedOutputFormat(output_format));
        }

        let geometry = config.geometry();
        let conversion = ConversionKernel::new(
            &ctx.device,
            &ctx.queue,
            geometry,
            output_format,
            config.color_range,
        )?;

        let mut blur = BlurStage::new(
            ctx.device.clone(),
            ctx.queue.clone(),
            geometry,
            output_format,
        )?;
        blur.set_sigma(config.initial_sigma)?;

        let bridge = TextureBridge::new(ctx.device.clone(), ctx.queue.clone());
        let sigma = Arc::new(BlurSigma::new(config.initial_sigma, config.max_sigma));

        let (groups_x, groups_y) = geometry.workgroups();
        log::info!(
            "Frame pipeline ready: {}x{} {:?}, {}x{} workgroups of {}x{}, {:?} range",
            config.width,
            config.height,
            output_format,
            groups_x,
            groups_y,
            config.workgroup_size,
            config.workgroup_size,
            config.color_range
        );

        Ok(Self {
            ctx,
            config,
            output_format,
            bridge,
            conversion,
            blur: Mutex::new(blur),
            sigma,
            pending: FrameSlot::new(),
            next_sequence: AtomicU64::new(0),
            stats: PipelineStats::default(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn geometry(&self) -> DispatchGeometry {
        self.conversion.geometry()
    }

    pub fn output_format(&self) -> TextureFormat {
        self.output_format
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Handle for pushing σ from another thread.
    pub fn blur_control(&self) -> BlurControl {
        BlurControl::new(Arc::clone(&self.sigma))
    }

    /// Shorthand for `blur_control().set_blur_sigma(sigma)`.
    pub fn set_blur_sigma(&self, sigma: f32) {
        self.sigma.store(sigma);
    }

    pub fn blur_sigma(&self) -> f32 {
        self.sigma.load()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Plane texture pairs currently leased (pending or being encoded).
    pub fn outstanding_textures(&self) -> usize {
        self.bridge.cache().outstanding()
    }

    /// Whether a frame is waiting for the next render.
    pub fn has_pending_frame(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Bind a captured frame's planes and park it for the next render.
    ///
    /// Called from the frame-delivery thread. `frame` is only borrowed for
    /// this call. Returns the frame's sequence number, or why it was dropped.
    pub fn submit_frame(&self, frame: &dyn FrameBuffer) -> Result<u64, DropReason> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.stats.record_received();
        let mut run = FrameRun::new(sequence);

        let planes = match self.bind_planes(frame) {
            Ok(planes) => planes,
            Err(reason) => {
                self.stats.record_acquisition_drop();
                log::debug!("Dropped frame {}: {}", sequence, reason);
                run.drop_frame()?;
                return Err(reason);
            }
        };
        run.advance(FrameStage::TexturesBound)?;

        let sigma = self.sigma.load();
        let replaced = self.pending.store(PendingFrame { run, planes, sigma });
        if let Some(old) = replaced {
            self.stats.record_superseded();
            log::trace!(
                "Frame {} superseded by frame {}",
                old.run.sequence(),
                sequence
            );
        }

        Ok(sequence)
    }

    fn bind_planes(&self, frame: &dyn FrameBuffer) -> Result<PlaneTextures, DropReason> {
        let expected = (self.config.width, self.config.height);
        if let Some(luma) = frame.plane(0) {
            let found = (luma.width, luma.height);
            if found != expected {
                return Err(DropReason::ResolutionMismatch { expected, found });
            }
        }
        Ok(self.bridge.wrap(frame)?)
    }

    /// Encode, submit and present the pending frame, if any.
    ///
    /// Called on the display cadence. Does not wait for the GPU.
    pub fn render(&self, surface: &mut dyn PresentationSurface) -> RenderOutcome {
        let PendingFrame {
            mut run,
            planes,
            sigma,
        } = match self.pending.take() {
            Some(pending) => pending,
            None => return RenderOutcome::Idle,
        };

        let mut blur = None;
        match self.encode_and_present(&mut run, &planes, sigma, surface, &mut blur) {
            Ok(()) => {
                self.stats.record_presented();
                log::trace!("Presented frame {} (sigma {})", run.sequence(), sigma);
                RenderOutcome::Presented(FrameReport {
                    sequence: run.sequence(),
                    sigma,
                    blur,
                    trace: run.into_trace(),
                    drop_reason: None,
                })
            }
            Err(reason) => {
                self.stats.record_presentation_drop();
                log::debug!("Dropped frame {}: {}", run.sequence(), reason);
                if let Err(e) = run.drop_frame() {
                    log::error!("{}", e);
                }
                RenderOutcome::Dropped(FrameReport {
                    sequence: run.sequence(),
                    sigma,
                    blur,
                    trace: run.into_trace(),
                    drop_reason: Some(reason),
                })
            }
        }
    }

    fn encode_and_present(
        &self,
        run: &mut FrameRun,
        planes: &PlaneTextures,
        sigma: f32,
        surface: &mut dyn PresentationSurface,
        blur_pass: &mut Option<BlurPass>,
    ) -> Result<(), DropReason> {
        let expected = (self.config.width, self.config.height);
        if surface.size() != expected {
            return Err(DropReason::SurfaceSizeMismatch {
                expected,
                found: surface.size(),
            });
        }
        if surface.format() != self.output_format {
            return Err(DropReason::SurfaceFormatMismatch {
                expected: self.output_format,
                found: surface.format(),
            });
        }

        let output = surface.acquire()?;

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        self.conversion
            .encode(&self.ctx.device, &mut encoder, planes, output.view());
        run.advance(FrameStage::ConversionEncoded)?;

        let pass = self.encode_blur(&mut encoder, output.view(), sigma);
        *blur_pass = Some(pass);
        run.advance(FrameStage::BlurEncoded)?;

        self.ctx.queue.submit(Some(encoder.finish()));
        run.advance(FrameStage::Submitted)?;

        surface.present(output);
        run.advance(FrameStage::Presented)?;

        Ok(())
    }

    fn encode_blur(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        sigma: f32,
    ) -> BlurPass {
        let mut stage = self
            .blur
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match stage.set_sigma(sigma) {
            Ok(true) => self.stats.record_blur_rebuild(),
            Ok(false) => {}
            Err(e) => {
                log::warn!("Blur filter rebuild failed, presenting unblurred: {}", e);
            }
        }

        let pass = stage.encode(encoder, target);
        if pass == BlurPass::Skipped {
            self.stats.record_blur_skipped();
        }
        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(drop_reason: Option<DropReason>) -> FrameReport {
        FrameReport {
            sequence: 7,
            sigma: 1.5,
            blur: None,
            trace: vec![FrameStage::FrameArrived, FrameStage::TexturesBound],
            drop_reason,
        }
    }

    #[test]
    fn test_render_outcome_report() {
        assert_eq!(RenderOutcome::Idle.report(), None);
        assert!(!RenderOutcome::Idle.is_presented());

        let presented = RenderOutcome::Presented(report(None));
        assert!(presented.is_presented());
        assert_eq!(presented.report().map(|r| r.sequence), Some(7));

        let dropped = RenderOutcome::Dropped(report(Some(DropReason::PresentationUnavailable(
            SurfaceError::NotReady,
        ))));
        assert!(!dropped.is_presented());
        assert!(dropped.report().and_then(|r| r.drop_reason.as_ref()).is_some());
    }

    #[test]
    fn test_drop_reason_conversions() {
        let reason: DropReason = SurfaceError::Timeout.into();
        assert_eq!(
            reason,
            DropReason::PresentationUnavailable(SurfaceError::Timeout)
        );

        let reason: DropReason = BridgeError::CacheExhausted { capacity: 3 }.into();
        assert!(matches!(reason, DropReason::Acquisition(_)));
    }
}
