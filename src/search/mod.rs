//! Remote search page source.
//!
//! The pagination loop only needs "give me the body of page N". That seam is
//! the [`PageSource`] trait; [`SearchClient`] is the HTTP implementation that
//! talks to the search endpoint.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::search::{PageSource, SearchClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SearchClient::new("https://www.pexels.com/search", "mountains")?;
//! let body = client.fetch_page(1).await?;
//! println!("{} bytes", body.len());
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::FetchError;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, EXPIRES, HeaderMap, HeaderName, HeaderValue, PRAGMA,
};
use tracing::{debug, instrument};
use url::Url;

use crate::user_agent;

/// Default search endpoint; the query is appended as a path segment.
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://www.pexels.com/search";

/// Connect timeout for search page requests.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Overall timeout for a single search page request.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Source of search result page bodies.
///
/// Implementations must treat pages as independent requests; the caller
/// guarantees strictly increasing page numbers, one request at a time.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the raw body of search results page `page`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure or a non-success status.
    async fn fetch_page(&self, page: u32) -> Result<String, FetchError>;
}

/// HTTP client for the remote search endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    search_url: Url,
}

impl SearchClient {
    /// Creates a search client for `query` against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `base_url` is not an absolute
    /// http(s) URL, or [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, query: &str) -> Result<Self, FetchError> {
        let search_url = build_search_url(base_url, query)?;

        let client = Client::builder()
            .default_headers(default_headers())
            .user_agent(user_agent::random_browser_user_agent())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .map_err(|source| FetchError::Client { source })?;

        debug!(search_url = %search_url, "search client ready");

        Ok(Self { client, search_url })
    }

    /// The search URL without paging parameters.
    #[must_use]
    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    /// The full URL requested for `page`.
    #[must_use]
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("format", "js")
            .append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl PageSource for SearchClient {
    #[instrument(skip(self))]
    async fn fetch_page(&self, page: u32) -> Result<String, FetchError> {
        let url = self.page_url(page);
        debug!(url = %url, "fetching search page");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::network(url.as_str(), page, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url.as_str(), page, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(url.as_str(), page, e))?;

        debug!(page, bytes = body.len(), "search page received");
        Ok(body)
    }
}

/// Appends `query` to `base_url` as a single percent-encoded path segment.
fn build_search_url(base_url: &str, query: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(base_url).map_err(|_| FetchError::invalid_url(base_url))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::invalid_url(base_url));
    }

    url.path_segments_mut()
        .map_err(|()| FetchError::invalid_url(base_url))?
        .pop_if_empty()
        .push(query);
    url.set_query(None);

    Ok(url)
}

/// Request headers mimicking a browser asking for fresh, uncached results.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en;"));
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("x-compress"),
        HeaderValue::from_static("null"),
    );
    headers
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_search_url_appends_query_segment() {
        let url = build_search_url("https://www.pexels.com/search", "cats").unwrap();
        assert_eq!(url.as_str(), "https://www.pexels.com/search/cats");
    }

    #[test]
    fn test_build_search_url_handles_trailing_slash() {
        let url = build_search_url("https://www.pexels.com/search/", "cats").unwrap();
        assert_eq!(url.as_str(), "https://www.pexels.com/search/cats");
    }

    #[test]
    fn test_build_search_url_encodes_query() {
        let url = build_search_url("https://s.test/search", "red cars/fast").unwrap();
        assert_eq!(url.as_str(), "https://s.test/search/red%20cars%2Ffast");
    }

    #[test]
    fn test_build_search_url_rejects_non_http() {
        assert!(matches!(
            build_search_url("ftp://s.test/search", "x"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            build_search_url("not a url", "x"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_page_url_has_format_and_page() {
        let client = SearchClient::new("https://s.test/search", "dogs").unwrap();
        assert_eq!(
            client.page_url(7).as_str(),
            "https://s.test/search/dogs?format=js&page=7"
        );
    }

    #[test]
    fn test_default_headers_disable_caching() {
        let headers = default_headers();
        assert_eq!(headers.get(PRAGMA).unwrap(), "no-cache");
        assert_eq!(headers.get("dnt").unwrap(), "1");
        assert_eq!(headers.get("x-compress").unwrap(), "null");
    }
}
