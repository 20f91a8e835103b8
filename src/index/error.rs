//! Error types for the dedup index module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building the dedup index.
///
/// Every variant is fatal to the run: an index that silently skipped part of
/// the cache tree would cause cached images to be downloaded again.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A directory could not be listed.
    #[error("failed to list directory {path}: {source}")]
    ReadDir {
        /// The directory that could not be listed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An entry's metadata could not be read.
    #[error("failed to stat {path}: {source}")]
    Metadata {
        /// The entry whose metadata could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A directory scan task panicked or was cancelled.
    #[error("directory scan task failed: {source}")]
    ScanTask {
        /// The join error reported by the runtime.
        #[source]
        source: tokio::task::JoinError,
    },

    /// The scan concurrency limiter was closed while scans were pending.
    #[error("directory scan limiter closed unexpectedly")]
    LimiterClosed,
}

impl IndexError {
    /// Creates a directory listing error.
    pub fn read_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a metadata error.
    pub fn metadata(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Metadata {
            path: path.into(),
            source,
        }
    }
}
