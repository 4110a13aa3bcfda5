//! Cross-thread blur parameter cell.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// σ shared between the UI thread and the frame pipeline.
///
/// Stored as the bit pattern of an `f32`, so writes and reads are single
/// atomic operations. The last write wins; there is no queue.
#[derive(Debug)]
pub struct BlurSigma {
    bits: AtomicU32,
    max: f32,
}

impl BlurSigma {
    pub fn new(initial: f32, max: f32) -> Self {
        Self {
            bits: AtomicU32::new(initial.clamp(0.0, max).to_bits()),
            max,
        }
    }

    /// Store `sigma` clamped to `[0, max]`. Non-finite values are ignored.
    pub fn store(&self, sigma: f32) {
        if !sigma.is_finite() {
            log::debug!("Ignoring non-finite blur sigma {}", sigma);
            return;
        }
        self.bits
            .store(sigma.clamp(0.0, self.max).to_bits(), Ordering::Release);
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn max(&self) -> f32 {
        self.max
    }
}

/// Handle the UI uses to push σ. Cheap to clone, fire-and-forget.
#[derive(Debug, Clone)]
pub struct BlurControl {
    sigma: Arc<BlurSigma>,
}

impl BlurControl {
    pub(crate) fn new(sigma: Arc<BlurSigma>) -> Self {
        Self { sigma }
    }

    /// σ for the next submitted frame, clamped to `[0, max_sigma]`.
    pub fn set_blur_sigma(&self, sigma: f32) {
        self.sigma.store(sigma);
    }

    pub fn blur_sigma(&self) -> f32 {
        self.sigma.load()
    }

    pub fn max_sigma(&self) -> f32 {
        self.sigma.max()
    }
}
