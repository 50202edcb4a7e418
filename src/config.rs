//! Fetch configuration: limits, timeouts and retry budget.
//!
//! A [`FetchConfig`] is built once (defaults, optionally a JSON file, then
//! caller overrides) and handed to [`ImageProcessor`](crate::ImageProcessor);
//! it is not changed afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::download::ByteQuota;
use crate::download::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_BYTES_PER_IMAGE, DEFAULT_MAX_BYTES_PER_SESSION,
    DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_CONCURRENCY, MAX_REQUEST_TIMEOUT_SECS,
    MIN_CONCURRENCY,
};

/// Errors raised while loading or validating a [`FetchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Concurrency outside the supported range.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Request timeout outside the supported range.
    #[error("invalid request timeout {value}s: must be between 1 and {MAX_REQUEST_TIMEOUT_SECS}")]
    InvalidTimeout {
        /// The invalid value that was provided.
        value: u64,
    },

    /// Retry budget of zero attempts.
    #[error("invalid max_retries 0: at least one attempt is required")]
    InvalidRetries,

    /// Byte ceilings that cannot both be honoured.
    #[error(
        "invalid byte limits: per-image {per_image} must be > 0 and <= per-session {per_session}"
    )]
    InvalidByteLimits {
        /// Configured per-image ceiling.
        per_image: u64,
        /// Configured per-session ceiling.
        per_session: u64,
    },

    /// Config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for [`FetchConfig`].
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// HTTP client construction failed.
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Limits applied while fetching remote images.
///
/// Missing fields in a config file fall back to the defaults:
///
/// | Field | Default |
/// |-------|---------|
/// | `max_concurrent_downloads` | 5 |
/// | `request_timeout_secs` | 10 |
/// | `max_retries` | 3 attempts |
/// | `max_bytes_per_image` | 100 MiB |
/// | `max_bytes_per_session` | 500 MiB |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Maximum number of images fetched at once.
    pub max_concurrent_downloads: usize,
    /// Timeout for one request, body included.
    pub request_timeout_secs: u64,
    /// Maximum attempts per image, the first one included.
    pub max_retries: u32,
    /// Largest accepted image.
    pub max_bytes_per_image: u64,
    /// Largest accepted total across one session.
    pub max_bytes_per_session: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: DEFAULT_CONCURRENCY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_bytes_per_image: DEFAULT_MAX_BYTES_PER_IMAGE,
            max_bytes_per_session: DEFAULT_MAX_BYTES_PER_SESSION,
        }
    }
}

impl FetchConfig {
    /// Loads a config from a JSON file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if a
    /// value is out of range.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.max_concurrent_downloads) {
            return Err(ConfigError::InvalidConcurrency {
                value: self.max_concurrent_downloads,
            });
        }
        if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(ConfigError::InvalidTimeout {
                value: self.request_timeout_secs,
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidRetries);
        }
        if self.max_bytes_per_image == 0 || self.max_bytes_per_image > self.max_bytes_per_session
        {
            return Err(ConfigError::InvalidByteLimits {
                per_image: self.max_bytes_per_image,
                per_session: self.max_bytes_per_session,
            });
        }
        Ok(())
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_max_concurrent_downloads(mut self, value: usize) -> Self {
        self.max_concurrent_downloads = value;
        self
    }

    /// Sets the per-request timeout in seconds.
    #[must_use]
    pub fn with_request_timeout_secs(mut self, value: u64) -> Self {
        self.request_timeout_secs = value;
        self
    }

    /// Sets the maximum attempts per image.
    #[must_use]
    pub fn with_max_retries(mut self, value: u32) -> Self {
        self.max_retries = value;
        self
    }

    /// Sets the per-image byte ceiling.
    #[must_use]
    pub fn with_max_bytes_per_image(mut self, value: u64) -> Self {
        self.max_bytes_per_image = value;
        self
    }

    /// Sets the per-session byte ceiling.
    #[must_use]
    pub fn with_max_bytes_per_session(mut self, value: u64) -> Self {
        self.max_bytes_per_session = value;
        self
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Byte ceilings as a [`ByteQuota`].
    #[must_use]
    pub fn quota(&self) -> ByteQuota {
        ByteQuota::new(self.max_bytes_per_image, self.max_bytes_per_session)
    }
}
