//! Retry classification and jittered exponential backoff.
//!
//! When an image fetch fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - timeouts and HTTP 408, 429, 503, 504
//! - [`FailureType::Permanent`] - everything else, HTTP 500 included
//!
//! The [`RetryPolicy`] then decides whether another attempt is made and how
//! long to wait before it. The wait is drawn uniformly from
//! `[0, min(10s, 2^attempt s)]` using a generator owned by the policy, so
//! tests can seed it.
//!
//! # Example
//!
//! ```
//! use mdpdf_core::download::{FetchError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::seeded(3, 7);
//! let error = FetchError::http_status("https://example.com/a.png", 503);
//!
//! match policy.should_retry(classify_error(&error), 0) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("retry #{attempt} in {delay:?}");
//!     }
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use super::FetchError;
use super::constants::{BACKOFF_CAP_UNITS, BACKOFF_UNIT, DEFAULT_MAX_RETRIES};

/// Classification of fetch failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    Transient,

    /// Failure that will not be retried.
    Permanent,
}

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the fetch after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which retry this is (1 for the first retry).
        attempt: u32,
    },

    /// Do not retry the fetch.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry budget and backoff generator.
///
/// Clones share the same random source.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// One backoff unit; attempt `k` waits at most `min(cap, 2^k)` units.
    unit: Duration,

    rng: Arc<Mutex<StdRng>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// Creates a policy with an entropy-seeded generator.
    ///
    /// `max_attempts` below 1 is raised to 1.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self::with_rng(max_attempts, StdRng::from_entropy())
    }

    /// Creates a policy whose jitter sequence is fully determined by `seed`.
    #[must_use]
    pub fn seeded(max_attempts: u32, seed: u64) -> Self {
        Self::with_rng(max_attempts, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_attempts: u32, rng: StdRng) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            unit: BACKOFF_UNIT,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Replaces the backoff unit (one second by default).
    #[must_use]
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Upper bound of the wait drawn by [`backoff`](Self::backoff) for `attempt`.
    #[must_use]
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let units = if attempt >= 4 {
            BACKOFF_CAP_UNITS
        } else {
            (1u32 << attempt).min(BACKOFF_CAP_UNITS)
        };
        self.unit * units
    }

    /// Draws a wait uniformly from `[0, backoff_ceiling(attempt)]`.
    ///
    /// `attempt` is 0 for the first retry decision.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling_nanos =
            u64::try_from(self.backoff_ceiling(attempt).as_nanos()).unwrap_or(u64::MAX);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_nanos(rng.gen_range(0..=ceiling_nanos))
    }

    /// Determines whether to retry after a failed attempt.
    ///
    /// # Arguments
    ///
    /// * `failure_type` - Classification of the failure
    /// * `attempt` - Zero-based index of the attempt that just failed
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt.saturating_add(1) >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.backoff(attempt);
        debug!(attempt, delay_ms = delay.as_millis(), "will retry");

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }
}

/// Returns whether `error` is worth retrying.
#[must_use]
pub fn is_transient(error: &FetchError) -> bool {
    classify_error(error) == FailureType::Transient
}

/// Classifies a fetch error into a failure type.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | HTTP 408, 429, 503, 504 | Transient |
/// | Any other HTTP status (400, 401, 403, 404, 500, ...) | Permanent |
/// | Network (non-timeout) | Permanent |
/// | Not an image, quota, IO, invalid URL | Permanent |
///
/// HTTP 500 is permanent: a broken upstream resource is more likely than a
/// load spike.
#[instrument]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::Timeout { .. } => FailureType::Transient,
        FetchError::HttpStatus { status, .. } => classify_http_status(*status),
        FetchError::Network { .. }
        | FetchError::NotAnImage { .. }
        | FetchError::Quota { .. }
        | FetchError::Io { .. }
        | FetchError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient, // Request Timeout
        429 => FailureType::Transient, // Too Many Requests
        503 => FailureType::Transient, // Service Unavailable
        504 => FailureType::Transient, // Gateway Timeout
        _ => FailureType::Permanent,
    }
}
