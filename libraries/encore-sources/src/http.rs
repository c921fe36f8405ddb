//! Thin HTTP layer shared by all backends
//!
//! Wraps `reqwest` with the timeouts, retry policy, and streaming
//! download-to-disk behavior every backend needs. Backends convert the
//! errors surfaced here into `None` at their own boundary; nothing above
//! them ever sees a raw HTTP failure.

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Timeout for metadata requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for payload downloads.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Redirect cap for both clients.
const MAX_REDIRECTS: usize = 2;

/// GET retry attempts before giving up.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff between retries.
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// HTTP layer errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Transport-level failure (connect, timeout, TLS, ...).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success status after redirects.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Local filesystem failure while writing a download.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Caller passed an empty URL.
    #[error("empty URL")]
    EmptyUrl,
}

/// Result alias for the HTTP layer.
pub type Result<T> = std::result::Result<T, HttpError>;

/// Shared HTTP client with separate metadata and download timeouts.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    downloader: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
}

impl HttpClient {
    /// Create a client with no catalog-API credentials attached.
    pub fn new() -> Result<Self> {
        Self::with_api(None, None)
    }

    /// Create a client that attaches `X-API-Key` to requests under
    /// `api_url`.
    pub fn with_api(api_url: Option<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("encore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let downloader = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("encore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            downloader,
            api_url,
            api_key,
        })
    }

    /// GET a JSON document with retries and exponential backoff.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        if url.is_empty() {
            return Err(HttpError::EmptyUrl);
        }

        let mut attempt = 0;
        loop {
            match self.try_get_json(url).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        warn!(url = %url, error = %err, "request failed, giving up");
                        return Err(err);
                    }
                    debug!(url = %url, attempt, error = %err, "request failed, retrying");
                    tokio::time::sleep(BACKOFF_BASE * 2u32.pow(attempt - 1)).await;
                }
            }
        }
    }

    async fn try_get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self.client.get(url);
        if let (Some(api_url), Some(api_key)) = (&self.api_url, &self.api_key) {
            if url.starts_with(api_url.as_str()) {
                request = request.header("X-API-Key", api_key);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// Stream a payload to disk.
    ///
    /// Skips the network entirely when `dest` already exists (downloads are
    /// content-addressed by track id, so an existing file is a cache hit).
    pub async fn download_file(&self, url: &str, dest: &Path) -> Result<PathBuf> {
        if url.is_empty() {
            return Err(HttpError::EmptyUrl);
        }

        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            debug!(path = %dest.display(), "download cache hit");
            return Ok(dest.to_path_buf());
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.downloader.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        // Stream into a sibling .part file and rename on success, so a
        // failed transfer never leaves a truncated file the cache check
        // above would treat as a hit.
        let mut part = dest.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        if let Err(err) = Self::stream_to_file(response, &part).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(err);
        }
        tokio::fs::rename(&part, dest).await?;

        info!(path = %dest.display(), "downloaded file");
        Ok(dest.to_path_buf())
    }

    async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }
}
