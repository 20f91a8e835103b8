//! Run-wide download counters shared across concurrent download tasks.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts saved and failed images for a whole run.
///
/// Shared via `Arc` between the pagination loop and every download task.
/// All mutation goes through atomic increments; `target` is fixed at
/// construction.
#[derive(Debug, Default)]
pub struct RunCounters {
    saved: AtomicUsize,
    failed: AtomicUsize,
    target: usize,
}

impl RunCounters {
    /// Creates zeroed counters for a run aiming at `target` saved images.
    #[must_use]
    pub fn new(target: usize) -> Self {
        Self {
            saved: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            target,
        }
    }

    /// Records one saved image and returns the new saved total.
    pub fn record_saved(&self) -> usize {
        self.saved.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records one failed image and returns the new failed total.
    pub fn record_failed(&self) -> usize {
        self.failed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the number of images saved so far.
    #[must_use]
    pub fn saved(&self) -> usize {
        self.saved.load(Ordering::SeqCst)
    }

    /// Returns the number of images that failed so far.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the run's target count.
    #[must_use]
    pub fn target(&self) -> usize {
        self.target
    }

    /// Returns true once the saved total has reached the target.
    #[must_use]
    pub fn target_reached(&self) -> bool {
        self.saved() >= self.target
    }
}
