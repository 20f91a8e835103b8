//! Per-image failure reasons.
//!
//! A [`DownloadError`] ends one image only. The engine logs it, removes the
//! partial file and carries on with the rest of the batch.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why an image was not saved.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Request or body stream broke off.
    #[error("transfer of image {url} failed: {source}")]
    Network {
        /// Image URL.
        url: String,
        /// reqwest transport or body error.
        #[source]
        source: reqwest::Error,
    },

    /// Request plus body did not finish before the item deadline.
    #[error("timeout downloading {url} after {after:?}")]
    Timeout {
        /// Image URL.
        url: String,
        /// Deadline that elapsed.
        after: Duration,
    },

    /// Image host answered with a non-success status.
    #[error("image host returned {status} for {url}")]
    HttpStatus {
        /// Image URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// Destination file could not be created, written or synced.
    #[error("cannot write image file {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// Extracted URL does not parse.
    #[error("malformed image URL: {url}")]
    InvalidUrl {
        /// Raw URL text.
        url: String,
    },
}

impl DownloadError {
    /// Transfer failure for `url`.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Deadline of `after` elapsed for `url`.
    pub fn timeout(url: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            after,
        }
    }

    /// Non-success `status` from the image host.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Filesystem failure on the destination `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `url` could not be parsed.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// True when the item deadline fired.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// No blanket From impls: the url or path has to be supplied at the call site.
