//! HTTP client wrapper that fetches one image into the working directory.
//!
//! This module provides the `HttpClient` struct which performs a single
//! fetch attempt: GET with timeout, response validation, quota enforcement
//! and streaming to disk. Retrying is left to the engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::error::FetchError;
use super::filename::{image_path, is_image_content_type};
use super::quota::{ByteQuota, QuotaExceeded};
use super::state::SessionState;
use crate::user_agent;

/// HTTP client for fetching images with streaming support.
///
/// Created once per processor and cloned into every fetch task, so all
/// requests share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    request_timeout: Duration,
}

/// Result of a single successful fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    /// Local path of the image.
    pub path: PathBuf,
    /// Bytes written by this attempt (0 for cache hits).
    pub bytes: u64,
    /// Whether the path came from the session cache.
    pub cached: bool,
}

impl HttpClient {
    /// Creates a client whose requests are bounded by `request_timeout`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. Use [`try_new`](Self::try_new) to handle that case.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(request_timeout: Duration) -> Self {
        Self::try_new(request_timeout).expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client whose requests are bounded by `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns the builder error when the TLS backend cannot be initialised.
    pub fn try_new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .gzip(true)
            .user_agent(user_agent::default_fetch_user_agent())
            .build()?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Performs one fetch attempt for `url`.
    ///
    /// Steps:
    /// 1. Return the cached path if `url` was already fetched this session
    /// 2. GET with the per-request timeout
    /// 3. Require HTTP 200 and an `image/*` Content-Type
    /// 4. Check a declared Content-Length against `quota` before streaming
    /// 5. Stream the body to a hash-named file under `work_dir`
    /// 6. Without a declared length, check the actual size afterwards
    /// 7. Record path and size in `state`
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] describing the first failed step. Transport
    /// errors are returned as-is for the caller to classify. No partial file
    /// is left behind on error.
    #[instrument(skip(self, work_dir, state, quota), fields(url = %url))]
    pub async fn fetch_once(
        &self,
        url: &str,
        work_dir: &Path,
        state: &SessionState,
        quota: &ByteQuota,
    ) -> Result<FetchedImage, FetchError> {
        if let Some(path) = state.cached(url) {
            debug!(path = %path.display(), "cache hit");
            return Ok(FetchedImage {
                path,
                bytes: 0,
                cached: true,
            });
        }

        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_transport(url, e))?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::http_status(url, response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_image_content_type(&content_type) {
            return Err(FetchError::not_an_image(url, content_type));
        }

        let declared_length = declared_content_length(&response);
        if let Some(length) = declared_length {
            quota
                .check(state, length)
                .map_err(|e| FetchError::quota(url, e))?;
        }

        let path = image_path(work_dir, url, &content_type);
        debug!(path = %path.display(), ?declared_length, "streaming image");

        let file = File::create(&path)
            .await
            .map_err(|e| FetchError::io(path.clone(), e))?;

        let stream_result =
            stream_to_file(file, response, url, &path, quota.max_per_image()).await;
        let checked = stream_result.and_then(|bytes| {
            if declared_length.is_none() {
                quota
                    .check(state, bytes)
                    .map_err(|e| FetchError::quota(url, e))?;
            }
            Ok(bytes)
        });

        let bytes = match checked {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "removing partial file");
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }
        };

        state.record_success(url, path.clone(), bytes);
        info!(path = %path.display(), bytes, "image fetched");

        Ok(FetchedImage {
            path,
            bytes,
            cached: false,
        })
    }
}

/// Content-Length header value when present and non-zero.
fn declared_content_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&length| length > 0)
}

/// Streams the response body to `file`, returning bytes written.
///
/// Stops with a per-image quota error as soon as more than `limit` bytes
/// have arrived.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    limit: u64,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::from_transport(url, e))?;

        bytes_written += chunk.len() as u64;
        if bytes_written > limit {
            return Err(FetchError::quota(
                url,
                QuotaExceeded::PerImage {
                    size: bytes_written,
                    limit,
                },
            ));
        }

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
