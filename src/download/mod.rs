//! Image download engine with bounded concurrency and per-item deadlines.
//!
//! This module turns a batch of image descriptors into files on disk.
//!
//! # Features
//!
//! - Streaming downloads (bodies go straight to the open file)
//! - Semaphore-bounded concurrency, no unbounded buffering of work
//! - Per-item deadline covering request and body; timed-out transfers are
//!   cancelled and their partial files removed
//! - Run-wide atomic counters shared with the pagination loop
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::download::{HttpClient, ImageFetch};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let path = Path::new("./images/result/photo.jpg");
//! let mut file = tokio::fs::File::create(path).await?;
//! let bytes = client.fetch_into("https://example.com/photo.jpg", &mut file, path).await?;
//! println!("wrote {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod counters;
mod engine;
mod error;

pub use client::{HttpClient, ImageFetch};
pub use constants::{DEFAULT_CONCURRENCY, DEFAULT_ITEM_TIMEOUT, MAX_CONCURRENCY, MIN_CONCURRENCY};
pub use counters::RunCounters;
pub use engine::{BatchStats, BoundedDownloader, EngineError};
pub use error::DownloadError;
