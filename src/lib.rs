//! Harvester Core Library
//!
//! This library provides the core functionality for the harvester tool,
//! which walks the pages of a remote image search and saves every image
//! it has not seen before into a local directory.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`index`] - Dedup index built from the cache directory tree
//! - [`extract`] - Image descriptor extraction from search page bodies
//! - [`search`] - Remote search page source
//! - [`download`] - Bounded, timeout-aware image download engine
//! - [`crawl`] - Pagination loop tying the pieces together
//! - [`config`] - Validated run configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod crawl;
pub mod download;
pub mod extract;
pub mod index;
pub mod search;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, HarvestConfig};
pub use crawl::{CrawlError, CrawlOptions, CrawlState, CrawlSummary, Crawler};
pub use download::{
    BatchStats, BoundedDownloader, DEFAULT_CONCURRENCY, DEFAULT_ITEM_TIMEOUT, DownloadError,
    EngineError, HttpClient, ImageFetch, RunCounters,
};
pub use extract::{ImageDescriptor, extract_images};
pub use index::{DedupIndex, IndexError, trim_extension};
pub use search::{FetchError, PageSource, SearchClient};
