//! Per-frame state machine.

use std::fmt;

/// Where a frame is in its pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    FrameArrived,
    TexturesBound,
    ConversionEncoded,
    BlurEncoded,
    Submitted,
    Presented,
    Dropped,
}

impl FrameStage {
    /// The only stage that may follow this one on the success path.
    pub fn next(self) -> Option<FrameStage> {
        match self {
            FrameStage::FrameArrived => Some(FrameStage::TexturesBound),
            FrameStage::TexturesBound => Some(FrameStage::ConversionEncoded),
            FrameStage::ConversionEncoded => Some(FrameStage::BlurEncoded),
            FrameStage::BlurEncoded => Some(FrameStage::Submitted),
            FrameStage::Submitted => Some(FrameStage::Presented),
            FrameStage::Presented | FrameStage::Dropped => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FrameStage::Presented | FrameStage::Dropped)
    }
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An out-of-order transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Frame {sequence}: cannot move from {from} to {to}")]
pub struct StageError {
    pub sequence: u64,
    pub from: FrameStage,
    pub to: FrameStage,
}

/// One frame's walk through [`FrameStage`], recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRun {
    sequence: u64,
    trace: Vec<FrameStage>,
}

impl FrameRun {
    pub fn new(sequence: u64) -> Self {
        Self {
            sequence,
            trace: vec![FrameStage::FrameArrived],
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn stage(&self) -> FrameStage {
        // Never empty: starts at FrameArrived
        self.trace[self.trace.len() - 1]
    }

    pub fn trace(&self) -> &[FrameStage] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<FrameStage> {
        self.trace
    }

    /// Move to `to`, which must be the next stage in sequence.
    pub fn advance(&mut self, to: FrameStage) -> Result<(), StageError> {
        let from = self.stage();
        if from.next() != Some(to) {
            return Err(StageError {
                sequence: self.sequence,
                from,
                to,
            });
        }
        self.trace.push(to);
        Ok(())
    }

    /// Terminate the run early.
    pub fn drop_frame(&mut self) -> Result<(), StageError> {
        let from = self.stage();
        if from.is_terminal() {
            return Err(StageError {
                sequence: self.sequence,
                from,
                to: FrameStage::Dropped,
            });
        }
        self.trace.push(FrameStage::Dropped);
        Ok(())
    }
}
