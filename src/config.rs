//! Validated run configuration.
//!
//! The binary parses command-line options and converts them into a
//! [`HarvestConfig`]; the library never sees CLI types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::crawl::CrawlOptions;
use crate::download::{DEFAULT_CONCURRENCY, DEFAULT_ITEM_TIMEOUT, MAX_CONCURRENCY, MIN_CONCURRENCY};
use crate::search::DEFAULT_SEARCH_BASE_URL;

/// Default pause between page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(1000);

/// Default first page.
pub const DEFAULT_START_PAGE: u32 = 1;

/// Configuration validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The target image count was zero.
    #[error("target count must be at least 1")]
    ZeroTarget,

    /// The search query was empty or whitespace.
    #[error("search query must not be empty")]
    EmptyQuery,

    /// The start page was zero.
    #[error("start page must be at least 1")]
    ZeroStartPage,

    /// The concurrency limit was out of range.
    #[error("concurrent downloads must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}, got {0}")]
    Concurrency(usize),

    /// The per-item timeout was zero.
    #[error("download timeout must be greater than zero")]
    ZeroTimeout,

    /// The page limit was zero.
    #[error("page limit must be at least 1")]
    ZeroMaxPages,

    /// The search base URL is not an absolute http(s) URL.
    #[error("invalid search base URL: {0}")]
    BaseUrl(String),
}

/// Everything a harvest run needs, already defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Number of new images to save.
    pub target_count: usize,
    /// Search query.
    pub query: String,
    /// Pause between page requests.
    pub page_delay: Duration,
    /// First page to request.
    pub start_page: u32,
    /// Output directory; must be empty at start.
    pub images_dir: PathBuf,
    /// Cache directory the dedup index is built from.
    pub cache_dir: PathBuf,
    /// Maximum images in flight.
    pub concurrency: usize,
    /// Deadline for each image.
    pub item_timeout: Duration,
    /// Optional cap on pages requested.
    pub max_pages: Option<u32>,
    /// Search endpoint the query is appended to.
    pub base_url: String,
}

impl HarvestConfig {
    /// Creates a configuration with defaults relative to `working_dir`.
    ///
    /// # Examples
    ///
    /// ```
    /// use harvester_core::HarvestConfig;
    /// use std::path::Path;
    ///
    /// let config = HarvestConfig::new(10, "forest", Path::new("/work"));
    /// assert_eq!(config.images_dir, Path::new("/work/images/result"));
    /// assert_eq!(config.cache_dir, Path::new("/work/images/cache"));
    /// assert_eq!(config.concurrency, 3);
    /// assert!(config.validate().is_ok());
    /// ```
    #[must_use]
    pub fn new(target_count: usize, query: impl Into<String>, working_dir: &Path) -> Self {
        Self {
            target_count,
            query: query.into(),
            page_delay: DEFAULT_PAGE_DELAY,
            start_page: DEFAULT_START_PAGE,
            images_dir: working_dir.join("images").join("result"),
            cache_dir: working_dir.join("images").join("cache"),
            concurrency: DEFAULT_CONCURRENCY,
            item_timeout: DEFAULT_ITEM_TIMEOUT,
            max_pages: None,
            base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
        }
    }

    /// Checks every field's range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_count == 0 {
            return Err(ConfigError::ZeroTarget);
        }
        if self.query.trim().is_empty() {
            return Err(ConfigError::EmptyQuery);
        }
        if self.start_page == 0 {
            return Err(ConfigError::ZeroStartPage);
        }
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::Concurrency(self.concurrency));
        }
        if self.item_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_pages == Some(0) {
            return Err(ConfigError::ZeroMaxPages);
        }
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(ConfigError::BaseUrl(self.base_url.clone())),
        }
    }

    /// Pagination parameters derived from this configuration.
    ///
    /// The target count is not part of them; it goes to
    /// [`RunCounters::new`](crate::download::RunCounters::new).
    #[must_use]
    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            start_page: self.start_page,
            page_delay: self.page_delay,
            max_pages: self.max_pages,
            dest_dir: self.images_dir.clone(),
        }
    }
}
