//! Error types for search page fetching.

use thiserror::Error;

/// Errors that can occur while fetching a search results page.
///
/// Unlike per-image download failures, these are fatal to the run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching page {page} from {url}: {source}")]
    Network {
        /// The requested page URL.
        url: String,
        /// The requested page number.
        page: u32,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("HTTP {status} fetching page {page} from {url}")]
    HttpStatus {
        /// The requested page URL.
        url: String,
        /// The requested page number.
        page: u32,
        /// The HTTP status code.
        status: u16,
    },

    /// The configured search base URL is malformed or cannot carry a path.
    #[error("invalid search URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build search HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, page: u32, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            page,
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, page: u32, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            page,
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}
