//! Error types for the download module.
//!
//! Fetch errors never abort a document: they are classified for retry and
//! end up as messages in the session's failure ledger. Only
//! [`ProcessError`] is returned to callers of the coordinator.

use std::path::PathBuf;

use thiserror::Error;

use super::quota::QuotaExceeded;

/// Errors that can occur while fetching a single image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request did not complete within the per-request timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Server answered with something other than HTTP 200.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Response was not an image.
    #[error("unexpected content type {content_type:?} for {url}: expected image/*")]
    NotAnImage {
        /// The URL whose response was rejected.
        url: String,
        /// The received Content-Type (empty when the header was missing).
        content_type: String,
    },

    /// Image would exceed a byte quota.
    #[error("quota exceeded for {url}: {source}")]
    Quota {
        /// The URL whose payload was rejected.
        url: String,
        /// Which ceiling was hit.
        #[source]
        source: QuotaExceeded,
    },

    /// File system error while persisting the image.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The extracted URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a content-type validation error.
    pub fn not_an_image(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self::NotAnImage {
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates a quota error.
    pub fn quota(url: impl Into<String>, source: QuotaExceeded) -> Self {
        Self::Quota {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Maps a reqwest error to [`FetchError::Timeout`] or [`FetchError::Network`].
    pub(crate) fn from_transport(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }
}

/// Errors returned by [`ImageProcessor::process_document`](super::ImageProcessor::process_document).
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The working directory could not be created.
    #[error("cannot create working directory {path}: {source}")]
    WorkDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

// As in the rest of the crate, no From<reqwest::Error> / From<std::io::Error>:
// every variant needs a url or path the source error does not carry.
