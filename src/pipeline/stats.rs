//! Frame counters.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineStats {
    received: AtomicU64,
    presented: AtomicU64,
    dropped_acquisition: AtomicU64,
    dropped_presentation: AtomicU64,
    superseded: AtomicU64,
    blur_rebuilds: AtomicU64,
    blur_skipped: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub frames_presented: u64,
    /// Frames rejected before any GPU work.
    pub dropped_acquisition: u64,
    /// Frames dropped for lack of a usable drawable.
    pub dropped_presentation: u64,
    /// Pending frames replaced by a newer one before rendering.
    pub frames_superseded: u64,
    /// Blur filters built after a σ change. Failed builds are not counted.
    pub blur_rebuilds: u64,
    /// Frames presented without blur because the filter could not be built.
    pub blur_skipped: u64,
}

impl StatsSnapshot {
    pub fn frames_dropped(&self) -> u64 {
        self.dropped_acquisition + self.dropped_presentation
    }
}

impl PipelineStats {
    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_presented(&self) {
        self.presented.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_acquisition_drop(&self) {
        self.dropped_acquisition.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_presentation_drop(&self) {
        self.dropped_presentation.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_blur_rebuild(&self) {
        self.blur_rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_blur_skipped(&self) {
        self.blur_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.received.load(Ordering::Relaxed),
            frames_presented: self.presented.load(Ordering::Relaxed),
            dropped_acquisition: self.dropped_acquisition.load(Ordering::Relaxed),
            dropped_presentation: self.dropped_presentation.load(Ordering::Relaxed),
            frames_superseded: self.superseded.load(Ordering::Relaxed),
            blur_rebuilds: self.blur_rebuilds.load(Ordering::Relaxed),
            blur_skipped: self.blur_skipped.load(Ordering::Relaxed),
        }
    }
}
