//! Error types for the pagination loop.

use thiserror::Error;

use crate::download::EngineError;
use crate::search::FetchError;

/// Errors that end a pagination run.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A search page could not be fetched.
    #[error("failed to fetch search page {page}: {source}")]
    Fetch {
        /// The page being requested.
        page: u32,
        /// The underlying fetch error.
        #[source]
        source: FetchError,
    },

    /// The download engine failed as a whole.
    #[error("download engine error: {0}")]
    Engine(#[from] EngineError),
}
