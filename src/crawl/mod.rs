//! Pagination loop driving fetch, filter and download page by page.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Fetching -> Filtering -> Downloading -> Done
//!    ^                          |
//!    +-------- Waiting <--------+
//! ```
//!
//! Pages are requested strictly one at a time in increasing order. A page
//! fetch failure ends the run; per-image failures never do. The loop
//! stops requesting pages once the saved total reaches the target, so the
//! last page can overshoot it.

mod error;

pub use error::CrawlError;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::download::BoundedDownloader;
use crate::extract::{ImageDescriptor, extract_images};
use crate::index::DedupIndex;
use crate::search::PageSource;

/// States of the pagination loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    /// Requesting the page at the cursor.
    Fetching,
    /// Dropping descriptors already present in the dedup index.
    Filtering,
    /// Saving the remaining descriptors.
    Downloading,
    /// Sleeping before the next page.
    Waiting,
    /// Finished.
    Done,
}

/// Parameters of one pagination run.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// First page to request.
    pub start_page: u32,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
    /// Optional cap on the number of pages requested.
    pub max_pages: Option<u32>,
    /// Directory images are saved into.
    pub dest_dir: PathBuf,
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    /// Images saved by this run.
    pub saved: usize,
    /// Images that failed or timed out.
    pub failed: usize,
    /// Images skipped because the dedup index already held them.
    pub skipped_cached: usize,
    /// Number of pages fetched.
    pub pages_fetched: u32,
    /// Last page number requested, if any.
    pub last_page: Option<u32>,
    /// Whether the saved total reached the target.
    pub target_reached: bool,
    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u128,
}

/// Drives page fetches and downloads until the target is reached.
///
/// The target lives in the downloader's [`RunCounters`](crate::download::RunCounters);
/// the crawler reads it from there.
pub struct Crawler<'a> {
    source: &'a dyn PageSource,
    index: &'a DedupIndex,
    downloader: &'a BoundedDownloader,
    options: CrawlOptions,
}

impl<'a> Crawler<'a> {
    /// Creates a crawler over the given collaborators.
    #[must_use]
    pub fn new(
        source: &'a dyn PageSource,
        index: &'a DedupIndex,
        downloader: &'a BoundedDownloader,
        options: CrawlOptions,
    ) -> Self {
        Self {
            source,
            index,
            downloader,
            options,
        }
    }

    /// Runs the loop to completion.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Fetch`] if a page cannot be fetched and
    /// [`CrawlError::Engine`] if the download engine itself breaks. Image
    /// failures are counted in the summary instead.
    #[instrument(skip(self), fields(start_page = self.options.start_page, target = self.downloader.counters().target()))]
    pub async fn run(&self) -> Result<CrawlSummary, CrawlError> {
        let started = Instant::now();
        let mut summary = CrawlSummary::default();
        let mut cursor = self.options.start_page;
        let mut pending: Vec<ImageDescriptor> = Vec::new();
        let mut state = CrawlState::Fetching;

        while state != CrawlState::Done {
            debug!(?state, page = cursor, "crawl state");

            state = match state {
                CrawlState::Fetching => {
                    let body = self
                        .source
                        .fetch_page(cursor)
                        .await
                        .map_err(|source| CrawlError::Fetch { page: cursor, source })?;
                    summary.pages_fetched += 1;
                    summary.last_page = Some(cursor);

                    pending = extract_images(&body);
                    if pending.is_empty() {
                        warn!(page = cursor, body_len = body.len(), "no images found on page");
                    } else {
                        debug!(page = cursor, images = pending.len(), "page parsed");
                    }
                    CrawlState::Filtering
                }
                CrawlState::Filtering => {
                    let before = pending.len();
                    pending.retain(|item| !self.index.contains(item.identifier()));
                    let skipped = before - pending.len();
                    summary.skipped_cached += skipped;
                    if skipped > 0 {
                        debug!(page = cursor, skipped, "skipped cached images");
                    }
                    CrawlState::Downloading
                }
                CrawlState::Downloading => {
                    if !pending.is_empty() {
                        let batch = self
                            .downloader
                            .download_all(std::mem::take(&mut pending), &self.options.dest_dir)
                            .await?;
                        summary.saved += batch.saved();
                        summary.failed += batch.failed();
                    }

                    info!(
                        page = cursor,
                        saved = summary.saved,
                        target = self.downloader.counters().target(),
                        "page complete"
                    );
                    self.after_page(&summary, cursor)
                }
                CrawlState::Waiting => {
                    tokio::time::sleep(self.options.page_delay).await;
                    match cursor.checked_add(1) {
                        Some(next) => {
                            cursor = next;
                            CrawlState::Fetching
                        }
                        None => {
                            warn!("page cursor exhausted");
                            CrawlState::Done
                        }
                    }
                }
                CrawlState::Done => CrawlState::Done,
            };
        }

        summary.target_reached = self.downloader.counters().target_reached();
        summary.elapsed_ms = started.elapsed().as_millis();

        info!(
            saved = summary.saved,
            failed = summary.failed,
            skipped_cached = summary.skipped_cached,
            pages = summary.pages_fetched,
            "crawl finished"
        );

        Ok(summary)
    }

    /// Termination check after a page's downloads have joined.
    fn after_page(&self, summary: &CrawlSummary, page: u32) -> CrawlState {
        if self.downloader.counters().target_reached() {
            return CrawlState::Done;
        }
        if self
            .options
            .max_pages
            .is_some_and(|max| summary.pages_fetched >= max)
        {
            info!(page, pages = summary.pages_fetched, "page limit reached before target");
            return CrawlState::Done;
        }
        CrawlState::Waiting
    }
}
