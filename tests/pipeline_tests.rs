//! Integration tests for the frame pipeline: conversion, blur, and frame handling.


use pipeline_fixtures::{max_channel_diff, pixel, red_variance, Harness, OUTPUT_FORMAT};
use ycbcr_blur::color::{ycbcr_to_rgb, ColorRange};
use ycbcr_blur::frame::synth::{checkerboard_frame, gradient_frame, rgb_frame, solid_frame};
use ycbcr_blur::gpu::GaussianKernel;
use ycbcr_blur::pipeline::MAX_BLUR_SIGMA;
use ycbcr_blur::{
    BlurPass, BridgeError, ConfigError, DropReason, FramePipeline, FrameStage, GpuContext, HostFrame,
    PipelineConfig, PipelineError, RenderOutcome, SurfaceError,
};

fn assert_rgb_close(actual: [u8; 4], expected: [u8; 3], tolerance: u8) {
    for c in 0..3 {
        assert!(
            actual[c].abs_diff(expected[c]) <= tolerance,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }
    assert_eq!(actual[3], 255, "alpha must be opaque");
}

// ==================== Conversion ====================

#[tokio::test]
async fn test_bt601_black_white_red() {
    let Some(mut h) = Harness::with_resolution(64, 48).await else {
        return;
    };

    let black = h.render_rgba(&solid_frame(64, 48, 0, 128, 128));
    assert_rgb_close(pixel(&black, 64, 10, 10), [0, 0, 0], 1);

    let white = h.render_rgba(&solid_frame(64, 48, 255, 128, 128));
    assert_rgb_close(pixel(&white, 64, 63, 47), [255, 255, 255], 1);

    let red_frame = rgb_frame(64, 48, 255, 0, 0);
    let (cb, cr) = red_frame.chroma(0, 0);
    let reference = ycbcr_to_rgb(red_frame.luma(0, 0), cb, cr, ColorRange::Full);

    let red = h.render_rgba(&red_frame);
    assert_rgb_close(pixel(&red, 64, 32, 24), reference, 1);
    assert!(reference[0] >= 250 && reference[1] <= 5 && reference[2] <= 5);
}

#[tokio::test]
async fn test_conversion_matches_cpu_reference() {
    let Some(mut h) = Harness::with_resolution(64, 48).await else {
        return;
    };

    let frame = gradient_frame(64, 48, 3);
    let rgba = h.render_rgba(&frame);

    for y in 0..48 {
        for x in 0..64 {
            let (cb, cr) = frame.chroma(x / 2, y / 2);
            let expected = ycbcr_to_rgb(frame.luma(x, y), cb, cr, ColorRange::Full);
            assert_rgb_close(pixel(&rgba, 64, x, y), expected, 1);
        }
    }
}

#[tokio::test]
async fn test_video_range_levels() {
    let config = PipelineConfig {
        color_range: ColorRange::Video,
        ..PipelineConfig::with_resolution(32, 32)
    };
    let Some(mut h) = Harness::new(config).await else {
        return;
    };

    let black = h.render_rgba(&solid_frame(32, 32, 16, 128, 128));
    assert_rgb_close(pixel(&black, 32, 0, 0), [0, 0, 0], 1);

    let white = h.render_rgba(&solid_frame(32, 32, 235, 128, 128));
    assert_rgb_close(pixel(&white, 32, 31, 31), [255, 255, 255], 1);
}

#[tokio::test]
async fn test_uneven_resolution_every_pixel_written() {
    // 40x26 leaves idle threads in the last workgroup column and row
    let Some(mut h) = Harness::with_resolution(40, 26).await else {
        return;
    };
    assert!(h.pipeline.geometry().idle_threads() > 0);

    // Drawables start zeroed, so any skipped pixel stays black
    let rgba = h.render_rgba(&solid_frame(40, 26, 255, 128, 128));
    assert_eq!(rgba.len(), 40 * 26 * 4);
    for y in 0..26 {
        for x in 0..40 {
            assert_rgb_close(pixel(&rgba, 40, x, y), [255, 255, 255], 1);
        }
    }
}

// ==================== Blur ====================

#[tokio::test]
async fn test_zero_sigma_is_identity() {
    let Some(mut h) = Harness::with_resolution(64, 48).await else {
        return;
    };
    let frame = gradient_frame(64, 48, 0);

    h.pipeline.set_blur_sigma(0.0);
    let unblurred = h.render_rgba(&frame);

    h.pipeline.set_blur_sigma(0.005);
    let negligible = h.render_rgba(&frame);

    assert!(max_channel_diff(&unblurred, &negligible) <= 1);
}

#[tokio::test]
async fn test_variance_non_increasing_in_sigma() {
    let Some(mut h) = Harness::with_resolution(128, 96).await else {
        return;
    };
    let frame = checkerboard_frame(128, 96, 4);

    let sharp = h.render_rgba(&frame);
    let mut previous = red_variance(&sharp, 128, 96, 16);
    assert!(previous > 10_000.0, "checkerboard should start high-contrast");

    for sigma in [0.5, 1.0, 2.0, 4.0] {
        h.pipeline.set_blur_sigma(sigma);
        let blurred = h.render_rgba(&frame);
        let variance = red_variance(&blurred, 128, 96, 16);
        assert!(
            variance <= previous + 1e-6,
            "sigma {}: variance {} rose above {}",
            sigma,
            variance,
            previous
        );
        previous = variance;
    }

    assert!(previous < 100.0, "sigma 4 should flatten the pattern");
}

#[tokio::test]
async fn test_blur_preserves_flat_color() {
    let Some(mut h) = Harness::with_resolution(64, 48).await else {
        return;
    };
    h.pipeline.set_blur_sigma(6.0);

    let rgba = h.render_rgba(&solid_frame(64, 48, 180, 128, 128));
    let expected = ycbcr_to_rgb(180, 128, 128, ColorRange::Full);
    for (x, y) in [(0, 0), (63, 0), (0, 47), (32, 24)] {
        assert_rgb_close(pixel(&rgba, 64, x, y), expected, 1);
    }
}

#[tokio::test]
async fn test_sigma_change_takes_effect_on_next_frame() {
    let Some(mut h) = Harness::with_resolution(64, 48).await else {
        return;
    };
    let frame = gradient_frame(64, 48, 0);

    h.pipeline.set_blur_sigma(1.0);
    h.pipeline.submit_frame(&frame).unwrap();
    let report = h.render().report().cloned().unwrap();
    assert_eq!(report.sigma, 1.0);
    assert_eq!(report.blur, Some(BlurPass::Applied { radius: 3 }));

    // Only the last of several calls is used, with no value in between
    let control = h.pipeline.blur_control();
    control.set_blur_sigma(2.0);
    control.set_blur_sigma(4.0);
    h.pipeline.submit_frame(&frame).unwrap();

    // σ is sampled at submission, so a later change waits for the next frame
    control.set_blur_sigma(0.0);
    let report = h.render().report().cloned().unwrap();
    assert_eq!(report.sigma, 4.0);
    assert_eq!(report.blur, Some(BlurPass::Applied { radius: 12 }));

    h.pipeline.submit_frame(&frame).unwrap();
    let report = h.render().report().cloned().unwrap();
    assert_eq!(report.sigma, 0.0);
    assert_eq!(report.blur, Some(BlurPass::Identity));

    assert_eq!(h.pipeline.stats().blur_rebuilds, 3);
}

#[tokio::test]
async fn test_unchanged_sigma_does_not_rebuild() {
    let Some(mut h) = Harness::with_resolution(32, 32).await else {
        return;
    };
    h.pipeline.set_blur_sigma(2.0);

    for i in 0..5 {
        h.render_rgba(&gradient_frame(32, 32, i));
    }
    assert_eq!(h.pipeline.stats().blur_rebuilds, 1);
}

#[tokio::test]
async fn test_sigma_above_range_clamps_to_largest_kernel() {
    let Some(mut h) = Harness::with_resolution(64, 48).await else {
        return;
    };

    h.pipeline.blur_control().set_blur_sigma(80.0);
    h.pipeline.submit_frame(&gradient_frame(64, 48, 0)).unwrap();
    let outcome = h.render();
    let report = outcome.report().cloned().unwrap();

    assert!(outcome.is_presented());
    assert_eq!(report.sigma, MAX_BLUR_SIGMA);
    assert_eq!(report.blur, Some(BlurPass::Applied { radius: 150 }));
    assert_eq!(h.pipeline.stats().blur_skipped, 0);
}

/// One-dimensional luma pattern with hard edges, including at both borders.
fn stripe_luma(i: u32) -> u8 {
    match (i / 3) % 3 {
        0 => 230,
        1 => 20,
        _ => 140,
    }
}

/// Frame whose luma varies only along x (`vertical`) or only along y.
fn stripe_frame(width: u32, height: u32, vertical: bool) -> HostFrame {
    let mut frame = HostFrame::new(width, height);
    for y in 0..height {
        for x in 0..width {
            frame.set_luma(x, y, stripe_luma(if vertical { x } else { y }));
        }
    }
    frame
}

/// Red channel along row `index` (`along_x`) or column `index`, as 0..1 floats.
fn red_line(rgba: &[u8], width: u32, height: u32, along_x: bool, index: u32) -> Vec<f32> {
    let len = if along_x { width } else { height };
    (0..len)
        .map(|i| {
            let (x, y) = if along_x { (i, index) } else { (index, i) };
            pixel(rgba, width, x, y)[0] as f32 / 255.0
        })
        .collect()
}

#[tokio::test]
async fn test_blur_matches_cpu_gaussian() {
    let (width, height) = (64, 48);
    let Some(mut h) = Harness::with_resolution(width, height).await else {
        return;
    };

    // Vertical stripes exercise the horizontal pass, horizontal stripes the vertical one
    for vertical in [true, false] {
        let frame = stripe_frame(width, height, vertical);
        h.pipeline.set_blur_sigma(0.0);
        let sharp = h.render_rgba(&frame);

        for sigma in [1.0f32, 2.5, 7.0] {
            h.pipeline.set_blur_sigma(sigma);
            let blurred = h.render_rgba(&frame);
            let kernel = GaussianKernel::new(sigma).unwrap();

            let (lines, cross) = if vertical { (height, width) } else { (width, height) };
            for index in [0, lines / 2, lines - 1] {
                let expected = kernel.apply_1d(&red_line(&sharp, width, height, vertical, index));
                let actual = red_line(&blurred, width, height, vertical, index);
                assert_eq!(actual.len(), cross as usize);

                for (i, (a, e)) in actual.iter().zip(&expected).enumerate() {
                    let diff = (a * 255.0 - (e * 255.0).round()).abs();
                    assert!(
                        diff <= 1.0,
                        "sigma {} {} stripes, line {} texel {}: got {}, expected {}",
                        sigma,
                        if vertical { "vertical" } else { "horizontal" },
                        index,
                        i,
                        a * 255.0,
                        e * 255.0
                    );
                }
            }
        }
    }
}

// ==================== Frame handling ====================

#[tokio::test]
async fn test_full_stage_trace() {
    let Some(mut h) = Harness::with_resolution(32, 32).await else {
        return;
    };
    let sequence = h.pipeline.submit_frame(&gradient_frame(32, 32, 0)).unwrap();

    match h.render() {
        RenderOutcome::Presented(report) => {
            assert_eq!(report.sequence, sequence);
            assert_eq!(
                report.trace,
                vec![
                    FrameStage::FrameArrived,
                    FrameStage::TexturesBound,
                    FrameStage::ConversionEncoded,
                    FrameStage::BlurEncoded,
                    FrameStage::Submitted,
                    FrameStage::Presented,
                ]
            );
            assert!(report.drop_reason.is_none());
        }
        other => panic!("expected presented frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_idle_without_pending_frame() {
    let Some(mut h) = Harness::with_resolution(32, 32).await else {
        return;
    };

    assert_eq!(h.render(), RenderOutcome::Idle);
    assert_eq!(h.surface.present_count(), 0);
}

#[tokio::test]
async fn test_dropped_frames_do_not_affect_next_frame() {
    let Some(mut h) = Harness::with_resolution(64, 48).await else {
        return;
    };

    // Acquisition failure: chroma plane shorter than its geometry
    let bad = HostFrame::from_planes(64, 48, vec![0; 64 * 48], 64, vec![128; 100], 64);
    let reason = h.pipeline.submit_frame(&bad).unwrap_err();
    assert!(matches!(
        reason,
        DropReason::Acquisition(BridgeError::TruncatedPlane { index: 1, .. })
    ));
    assert_eq!(h.render(), RenderOutcome::Idle);

    // Presentation failure: display not ready
    h.surface.set_available(false);
    h.pipeline
        .submit_frame(&solid_frame(64, 48, 255, 128, 128))
        .unwrap();
    match h.render() {
        RenderOutcome::Dropped(report) => {
            assert_eq!(
                report.drop_reason,
                Some(DropReason::PresentationUnavailable(SurfaceError::NotReady))
            );
            assert_eq!(report.trace.last(), Some(&FrameStage::Dropped));
            assert!(report.blur.is_none());
        }
        other => panic!("expected dropped frame, got {:?}", other),
    }
    assert_eq!(h.pipeline.outstanding_textures(), 0);

    // The next good frame is unaffected
    h.surface.set_available(true);
    let red_frame = rgb_frame(64, 48, 255, 0, 0);
    let (cb, cr) = red_frame.chroma(0, 0);
    let expected = ycbcr_to_rgb(red_frame.luma(0, 0), cb, cr, ColorRange::Full);
    let rgba = h.render_rgba(&red_frame);
    for (x, y) in [(0, 0), (63, 47), (20, 30)] {
        assert_rgb_close(pixel(&rgba, 64, x, y), expected, 1);
    }

    let stats = h.pipeline.stats();
    assert_eq!(stats.dropped_acquisition, 1);
    assert_eq!(stats.dropped_presentation, 1);
    assert_eq!(stats.frames_presented, 1);
}

#[tokio::test]
async fn test_resolution_mismatch_is_dropped() {
    let Some(mut h) = Harness::with_resolution(64, 48).await else {
        return;
    };

    let reason = h
        .pipeline
        .submit_frame(&solid_frame(32, 32, 0, 128, 128))
        .unwrap_err();
    assert_eq!(
        reason,
        DropReason::ResolutionMismatch {
            expected: (64, 48),
            found: (32, 32),
        }
    );
    assert_eq!(h.pipeline.outstanding_textures(), 0);
    assert_eq!(h.render(), RenderOutcome::Idle);
}

#[tokio::test]
async fn test_latest_frame_wins() {
    let Some(mut h) = Harness::with_resolution(32, 32).await else {
        return;
    };

    h.pipeline
        .submit_frame(&solid_frame(32, 32, 0, 128, 128))
        .unwrap();
    let latest = h
        .pipeline
        .submit_frame(&solid_frame(32, 32, 255, 128, 128))
        .unwrap();

    // The superseded frame's textures went straight back to the cache
    assert_eq!(h.pipeline.outstanding_textures(), 1);

    let outcome = h.render();
    assert_eq!(outcome.report().map(|r| r.sequence), Some(latest));
    assert_rgb_close(pixel(&h.read_presented(), 32, 5, 5), [255, 255, 255], 1);

    assert_eq!(h.render(), RenderOutcome::Idle);
    assert_eq!(h.pipeline.outstanding_textures(), 0);
    assert_eq!(h.pipeline.stats().frames_superseded, 1);
}

#[tokio::test]
async fn test_frames_from_another_thread() {
    let Some(mut h) = Harness::with_resolution(32, 32).await else {
        return;
    };
    let pipeline = std::sync::Arc::new(h.pipeline);

    let producer = {
        let pipeline = std::sync::Arc::clone(&pipeline);
        std::thread::spawn(move || {
            for i in 0..20 {
                let _ = pipeline.submit_frame(&gradient_frame(32, 32, i));
            }
        })
    };
    producer.join().unwrap();

    assert!(pipeline.render(&mut h.surface).is_presented());
    assert_eq!(pipeline.stats().frames_received, 20);
    assert_eq!(pipeline.outstanding_textures(), 0);
}

#[tokio::test]
async fn test_surface_size_mismatch_is_dropped() {
    let Some(mut h) = Harness::with_resolution(32, 32).await else {
        return;
    };
    let mut small =
        ycbcr_blur::OffscreenSurface::new(&h.ctx, 16, 16, OUTPUT_FORMAT, 3).unwrap();

    h.pipeline
        .submit_frame(&solid_frame(32, 32, 0, 128, 128))
        .unwrap();
    match h.pipeline.render(&mut small) {
        RenderOutcome::Dropped(report) => assert!(matches!(
            report.drop_reason,
            Some(DropReason::SurfaceSizeMismatch { .. })
        )),
        other => panic!("expected dropped frame, got {:?}", other),
    }
    assert_eq!(small.present_count(), 0);
    assert_eq!(h.pipeline.outstanding_textures(), 0);
}

// ==================== Startup ====================

#[tokio::test]
async fn test_startup_rejects_invalid_config() {
    let Ok(ctx) = GpuContext::new().await else {
        return;
    };

    let odd = PipelineConfig::with_resolution(63, 48);
    assert!(matches!(
        FramePipeline::new(ctx.clone(), odd, OUTPUT_FORMAT),
        Err(PipelineError::Config(_))
    ));

    let wide_sigma = PipelineConfig {
        max_sigma: 60.0,
        initial_sigma: 55.0,
        ..PipelineConfig::with_resolution(64, 48)
    };
    assert!(matches!(
        FramePipeline::new(ctx.clone(), wide_sigma, OUTPUT_FORMAT),
        Err(PipelineError::Config(ConfigError::MaxSigmaTooLarge { .. }))
    ));

    let config = PipelineConfig::with_resolution(64, 48);
    assert!(matches!(
        FramePipeline::new(ctx, config, wgpu::TextureFormat::R8Unorm),
        Err(PipelineError::UnsupportedOutputFormat(_))
    ));
}
