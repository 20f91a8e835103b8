//! Bounded download engine for batches of images.
//!
//! This module provides the [`BoundedDownloader`] which saves a batch of
//! [`ImageDescriptor`]s into a directory using a semaphore-based
//! concurrency limit and a per-item deadline.
//!
//! # Overview
//!
//! Every item reaches exactly one terminal state: saved, failed, or timed
//! out. Failures of one item never affect its siblings, and a failed or
//! timed-out item never leaves a file behind. [`BoundedDownloader::download_all`]
//! is a join point: it returns only after every item is terminal.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::download::{BoundedDownloader, HttpClient, RunCounters};
//! use harvester_core::ImageDescriptor;
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let counters = Arc::new(RunCounters::new(10));
//! let engine = BoundedDownloader::new(
//!     3,
//!     Duration::from_secs(60),
//!     Arc::new(HttpClient::new()),
//!     Arc::clone(&counters),
//! )?;
//! let items: Vec<_> = ImageDescriptor::from_url("https://example.com/a.jpg").into_iter().collect();
//! let stats = engine.download_all(items, Path::new("./images/result")).await?;
//! println!("saved {} of {}", stats.saved(), stats.total());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::fs::File;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::{DownloadError, ImageFetch, RunCounters};
use crate::extract::ImageDescriptor;

/// Error type for download engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The per-item timeout was zero.
    #[error("invalid per-item timeout: must be greater than zero")]
    InvalidTimeout,

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Outcome counts for one [`BoundedDownloader::download_all`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    saved: usize,
    failed: usize,
    timed_out: usize,
}

impl BatchStats {
    /// Returns the number of images saved.
    #[must_use]
    pub fn saved(&self) -> usize {
        self.saved
    }

    /// Returns the number of images that did not save, timeouts included.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Returns how many of the failures were per-item timeouts.
    #[must_use]
    pub fn timed_out(&self) -> usize {
        self.timed_out
    }

    /// Returns the number of items that reached a terminal state.
    #[must_use]
    pub fn total(&self) -> usize {
        self.saved + self.failed
    }

    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Saved => self.saved += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::TimedOut => {
                self.failed += 1;
                self.timed_out += 1;
            }
        }
    }
}

/// Terminal state of a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Saved,
    Failed,
    TimedOut,
}

/// Download engine for batches of images.
///
/// # Concurrency Model
///
/// - Each image runs in its own Tokio task
/// - A semaphore permit is acquired *before* a task is spawned, so at most
///   `concurrency` tasks exist at once and the rest of the batch waits
/// - Permits are released automatically when a task ends (RAII)
/// - The per-item deadline wraps request plus body streaming; when it
///   fires the transfer future is dropped, then the file is closed, then
///   it is deleted as a separate best-effort step
pub struct BoundedDownloader {
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Configured concurrency limit.
    concurrency: usize,
    /// Deadline for each image.
    item_timeout: Duration,
    /// Transfer implementation.
    fetcher: Arc<dyn ImageFetch>,
    /// Run-wide counters updated as items finish.
    counters: Arc<RunCounters>,
}

impl fmt::Debug for BoundedDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedDownloader")
            .field("concurrency", &self.concurrency)
            .field("item_timeout", &self.item_timeout)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl BoundedDownloader {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Maximum number of images in flight (1-100)
    /// * `item_timeout` - Deadline for each image, request plus body
    /// * `fetcher` - Transfer implementation, usually [`HttpClient`](super::HttpClient)
    /// * `counters` - Run-wide counters shared with the caller
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the concurrency is
    /// outside 1-100, or [`EngineError::InvalidTimeout`] for a zero timeout.
    #[instrument(level = "debug", skip(fetcher, counters))]
    pub fn new(
        concurrency: usize,
        item_timeout: Duration,
        fetcher: Arc<dyn ImageFetch>,
        counters: Arc<RunCounters>,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        if item_timeout.is_zero() {
            return Err(EngineError::InvalidTimeout);
        }

        debug!(
            concurrency,
            item_timeout_ms = item_timeout.as_millis(),
            "creating bounded downloader"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            item_timeout,
            fetcher,
            counters,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the configured per-item deadline.
    #[must_use]
    pub fn item_timeout(&self) -> Duration {
        self.item_timeout
    }

    /// Returns the run-wide counters this engine updates.
    #[must_use]
    pub fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    /// Downloads every item into `dest_dir`, returning once all are terminal.
    ///
    /// Each item is saved as `dest_dir/<filename>`. Callers must not submit
    /// two items with the same filename in one batch.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    ///
    /// Note: Individual download failures do NOT cause this method to error.
    /// They are logged and counted in the returned stats.
    #[instrument(skip(self, items), fields(items = items.len(), dest_dir = %dest_dir.display()))]
    pub async fn download_all(
        &self,
        items: Vec<ImageDescriptor>,
        dest_dir: &Path,
    ) -> Result<BatchStats, EngineError> {
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            // Blocks while `concurrency` items are in flight
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;

            let fetcher = Arc::clone(&self.fetcher);
            let counters = Arc::clone(&self.counters);
            let dest_dir = dest_dir.to_path_buf();
            let item_timeout = self.item_timeout;

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                save_item(fetcher.as_ref(), &item, &dest_dir, item_timeout, &counters).await
            }));
        }

        debug!(
            task_count = handles.len(),
            "waiting for downloads to complete"
        );

        let mut stats = BatchStats::default();
        for handle in handles {
            match handle.await {
                Ok(outcome) => stats.record(outcome),
                Err(e) => {
                    warn!(error = %e, "download task panicked");
                    self.counters.record_failed();
                    stats.record(ItemOutcome::Failed);
                }
            }
        }

        info!(
            saved = stats.saved(),
            failed = stats.failed(),
            timed_out = stats.timed_out(),
            "batch complete"
        );

        Ok(stats)
    }
}

/// Runs one item to a terminal state.
async fn save_item(
    fetcher: &dyn ImageFetch,
    item: &ImageDescriptor,
    dest_dir: &Path,
    item_timeout: Duration,
    counters: &RunCounters,
) -> ItemOutcome {
    let path = dest_dir.join(item.filename());
    let url = item.url();
    let started = Instant::now();

    info!(url = %url, "saving image");

    let mut file = match File::create(&path).await {
        Ok(file) => file,
        Err(e) => {
            let error = DownloadError::io(&path, e);
            warn!(url = %url, path = %path.display(), error = %error, "could not create image file");
            counters.record_failed();
            return ItemOutcome::Failed;
        }
    };

    let transfer = async {
        let bytes = fetcher.fetch_into(url, &mut file, &path).await?;
        file.sync_all()
            .await
            .map_err(|e| DownloadError::io(&path, e))?;
        Ok::<u64, DownloadError>(bytes)
    };

    let result = match tokio::time::timeout(item_timeout, transfer).await {
        Ok(result) => result,
        Err(_) => Err(DownloadError::timeout(url, item_timeout)),
    };

    // Waits for any write still in flight, then closes, before any removal attempt.
    close_file(file).await;

    match result {
        Ok(bytes) => {
            let saved = counters.record_saved();
            info!(
                url = %url,
                path = %path.display(),
                bytes,
                elapsed_ms = started.elapsed().as_millis(),
                saved,
                target = counters.target(),
                "saved image"
            );
            ItemOutcome::Saved
        }
        Err(error) => {
            let timed_out = error.is_timeout();
            if timed_out {
                warn!(
                    url = %url,
                    path = %path.display(),
                    timeout_ms = item_timeout.as_millis(),
                    "image download timed out"
                );
            } else {
                warn!(url = %url, path = %path.display(), error = %error, "image download failed");
            }
            discard_partial(&path).await;
            counters.record_failed();
            if timed_out {
                ItemOutcome::TimedOut
            } else {
                ItemOutcome::Failed
            }
        }
    }
}

async fn close_file(file: File) {
    let std_file = file.into_std().await;
    drop(std_file);
}

/// Removes a partially written file; failures are logged, never propagated.
async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial file"),
    }
}
