//! Single-slot, latest-wins handoff between frame delivery and rendering.

use std::sync::Mutex;

/// Holds at most one pending item.
///
/// `store` replaces whatever is pending and `take` empties the slot, each
/// under one short lock, so the reader never sees half of an update.
#[derive(Debug)]
pub struct FrameSlot<T> {
    pending: Mutex<Option<T>>,
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Put `item` in the slot, returning the item it replaced.
    pub fn store(&self, item: T) -> Option<T> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(item)
    }

    pub fn take(&self) -> Option<T> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub fn is_empty(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}
