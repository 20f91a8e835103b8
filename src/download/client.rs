//! HTTP client for streaming images to disk.
//!
//! This module provides the [`ImageFetch`] seam the engine downloads
//! through, and [`HttpClient`], the reqwest-backed implementation that
//! streams a response body into an already-open file.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::DownloadError;

/// Fetches one image into an open destination file.
///
/// The engine owns the file: it creates it before calling, enforces the
/// per-item deadline around the call (dropping the future cancels the
/// transfer), and removes the file when the call fails or times out.
#[async_trait]
pub trait ImageFetch: Send + Sync {
    /// Streams the body at `url` into `file`, returning bytes written.
    ///
    /// `path` is the location of `file`, for error context only.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] on transport failure, error status, or
    /// write failure.
    async fn fetch_into(&self, url: &str, file: &mut File, path: &Path)
    -> Result<u64, DownloadError>;
}

/// HTTP client for downloading images with streaming support.
///
/// This client is designed to be created once and reused for every image
/// of a run, taking advantage of connection pooling. It has no overall
/// request timeout of its own; the engine's per-item deadline covers it.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Builds the shared image client.
    ///
    /// # Panics
    ///
    /// Only if reqwest rejects the fixed builder settings below.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("image client settings are static"); // Static config, safe to panic
        Self { client }
    }
}

#[async_trait]
impl ImageFetch for HttpClient {
    #[instrument(skip(self, file), fields(path = %path.display()))]
    async fn fetch_into(
        &self,
        url: &str,
        file: &mut File,
        path: &Path,
    ) -> Result<u64, DownloadError> {
        let target = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        if let Err(status) = check_status(&response) {
            return Err(DownloadError::http_status(url, status));
        }

        let written = copy_body(response, file, url, path).await?;
        debug!(bytes = written, "image body streamed");
        Ok(written)
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), u16> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(status.as_u16())
    }
}

/// Copies the response body chunk by chunk into `file`.
///
/// Nothing is buffered beyond one chunk plus the writer's buffer, so a
/// cancelled transfer leaves at most a prefix of the image on disk.
async fn copy_body(
    response: reqwest::Response,
    file: &mut File,
    url: &str,
    path: &Path,
) -> Result<u64, DownloadError> {
    let mut out = BufWriter::new(file);
    let mut body = response.bytes_stream();
    let mut written = 0u64;

    while let Some(next) = body.next().await {
        let chunk = next.map_err(|e| DownloadError::network(url, e))?;
        out.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        written += chunk.len() as u64;
    }

    out.flush().await.map_err(|e| DownloadError::io(path, e))?;
    Ok(written)
}
