//! Example: Drive the frame pipeline from a synthetic camera.
//!
//! A source thread delivers scrolling gradient frames, a control thread sweeps
//! the blur σ, and the main thread renders into an offscreen triple buffer on
//! a fixed cadence. The last presented frame is written to a PNG.
//!
//! Run with:
//!     RUST_LOG=info cargo run --example synthetic_camera

use anyhow::{anyhow, Context};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use ycbcr_blur::frame::synth::gradient_frame;
use ycbcr_blur::{FramePipeline, GpuContext, OffscreenSurface, PipelineConfig, RenderOutcome};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const DISPLAY_INTERVAL: Duration = Duration::from_millis(16);
const RUN_TIME: Duration = Duration::from_secs(3);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let ctx = pollster::block_on(GpuContext::new()).context("no usable GPU adapter")?;
    println!("GPU: {}", ctx.adapter_info().name);

    let format = wgpu::TextureFormat::Rgba8Unorm;
    let config = PipelineConfig::with_resolution(WIDTH, HEIGHT);
    let mut surface = OffscreenSurface::new(
        &ctx,
        WIDTH,
        HEIGHT,
        format,
        config.surface_buffers as usize,
    )?;
    let pipeline = Arc::new(FramePipeline::new(ctx, config, format)?);
    let running = Arc::new(AtomicBool::new(true));

    // Camera delivery thread
    let source = {
        let pipeline = Arc::clone(&pipeline);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut index = 0u64;
            while running.load(Ordering::Relaxed) {
                let frame = gradient_frame(WIDTH, HEIGHT, index);
                if let Err(reason) = pipeline.submit_frame(&frame) {
                    log::warn!("Frame {} dropped at submit: {}", index, reason);
                }
                index += 1;
                thread::sleep(FRAME_INTERVAL);
            }
        })
    };

    // UI thread sweeping the blur slider
    let control = {
        let blur = pipeline.blur_control();
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let start = Instant::now();
            while running.load(Ordering::Relaxed) {
                let t = start.elapsed().as_secs_f32();
                blur.set_blur_sigma(((t * 2.0).sin() * 0.5 + 0.5) * 12.0);
                thread::sleep(Duration::from_millis(100));
            }
        })
    };

    let start = Instant::now();
    while start.elapsed() < RUN_TIME {
        match pipeline.render(&mut surface) {
            RenderOutcome::Presented(report) => {
                log::debug!(
                    "Presented frame {} at sigma {:.2} ({:?})",
                    report.sequence,
                    report.sigma,
                    report.blur
                );
            }
            RenderOutcome::Dropped(report) => {
                log::warn!(
                    "Frame {} dropped: {:?}",
                    report.sequence,
                    report.drop_reason
                );
            }
            RenderOutcome::Idle => {}
        }
        thread::sleep(DISPLAY_INTERVAL);
    }

    running.store(false, Ordering::Relaxed);
    source
        .join()
        .map_err(|_| anyhow!("source thread panicked"))?;
    control
        .join()
        .map_err(|_| anyhow!("control thread panicked"))?;

    let stats = pipeline.stats();
    println!("\nFrames received:   {}", stats.frames_received);
    println!("Frames presented:  {}", stats.frames_presented);
    println!("Frames superseded: {}", stats.frames_superseded);
    println!("Frames dropped:    {}", stats.frames_dropped());
    println!("Blur rebuilds:     {}", stats.blur_rebuilds);

    let rgba = surface
        .read_presented()?
        .ok_or_else(|| anyhow!("no frame was presented"))?;
    let image = image::RgbaImage::from_raw(WIDTH, HEIGHT, rgba)
        .ok_or_else(|| anyhow!("readback size does not match {}x{}", WIDTH, HEIGHT))?;
    let output = "synthetic_camera.png";
    image.save(output)?;
    println!("\nLast frame written to {}", output);

    Ok(())
}
