//! Constants for the download module (limits, timeouts, backoff).

use std::time::Duration;

/// Default number of images fetched concurrently.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Default per-request timeout in seconds (covers the whole request, body included).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Largest accepted per-request timeout (1 hour).
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Default maximum fetch attempts per image, including the first one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default ceiling for a single image (100 MiB).
pub const DEFAULT_MAX_BYTES_PER_IMAGE: u64 = 100 * 1024 * 1024;

/// Default ceiling for all images of one session (500 MiB).
pub const DEFAULT_MAX_BYTES_PER_SESSION: u64 = 500 * 1024 * 1024;

/// Unit of the exponential backoff: attempt `k` waits up to `2^k` units.
pub const BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Backoff ceiling expressed in units (10 units = 10 seconds by default).
pub const BACKOFF_CAP_UNITS: u32 = 10;
