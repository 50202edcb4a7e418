//! Per-image and per-session byte quotas.
//!
//! [`ByteQuota::check`] reads the session total under the state lock, but the
//! bytes are only added later by [`SessionState::record_success`] in a second
//! lock acquisition. Two concurrent downloads can therefore both pass the
//! check and jointly overshoot `max_per_session`; that relaxed accounting is
//! the documented behavior.

use thiserror::Error;

use super::state::SessionState;

/// Which ceiling a candidate size ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuotaExceeded {
    /// A single image is larger than the per-image ceiling.
    #[error("image size {size} bytes exceeds per-image limit of {limit} bytes")]
    PerImage {
        /// Candidate size in bytes.
        size: u64,
        /// Configured per-image ceiling.
        limit: u64,
    },

    /// Accepting the image would push the session over its ceiling.
    #[error("session total {current} + {size} bytes exceeds session limit of {limit} bytes")]
    Session {
        /// Bytes already recorded in the session.
        current: u64,
        /// Candidate size in bytes.
        size: u64,
        /// Configured session ceiling.
        limit: u64,
    },
}

/// Byte ceilings applied to every fetched image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteQuota {
    max_per_image: u64,
    max_per_session: u64,
}

impl ByteQuota {
    /// Creates a quota with the given ceilings.
    #[must_use]
    pub fn new(max_per_image: u64, max_per_session: u64) -> Self {
        Self {
            max_per_image,
            max_per_session,
        }
    }

    /// Per-image ceiling in bytes.
    #[must_use]
    pub fn max_per_image(&self) -> u64 {
        self.max_per_image
    }

    /// Session ceiling in bytes.
    #[must_use]
    pub fn max_per_session(&self) -> u64 {
        self.max_per_session
    }

    /// Validates `size` against both ceilings.
    ///
    /// The per-image ceiling is checked first and applies regardless of how
    /// much session budget remains.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaExceeded`] naming the ceiling that was hit.
    pub fn check(&self, state: &SessionState, size: u64) -> Result<(), QuotaExceeded> {
        self.check_per_image(size)?;
        state.with_total_bytes(|current| {
            if current.saturating_add(size) > self.max_per_session {
                Err(QuotaExceeded::Session {
                    current,
                    size,
                    limit: self.max_per_session,
                })
            } else {
                Ok(())
            }
        })
    }

    /// Validates `size` against the per-image ceiling only.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaExceeded::PerImage`] when `size` is too large.
    pub fn check_per_image(&self, size: u64) -> Result<(), QuotaExceeded> {
        if size > self.max_per_image {
            return Err(QuotaExceeded::PerImage {
                size,
                limit: self.max_per_image,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_check_accepts_within_limits() {
        let quota = ByteQuota::new(100, 1000);
        let state = SessionState::new();
        assert_eq!(quota.check(&state, 100), Ok(()));
    }

    #[test]
    fn test_check_rejects_oversized_image_even_with_session_budget() {
        let quota = ByteQuota::new(100, 1_000_000);
        let state = SessionState::new();
        assert_eq!(
            quota.check(&state, 101),
            Err(QuotaExceeded::PerImage {
                size: 101,
                limit: 100
            })
        );
    }

    #[test]
    fn test_check_rejects_when_session_would_overflow() {
        let quota = ByteQuota::new(100, 150);
        let state = SessionState::new();
        state.record_success("https://example.com/a.png", PathBuf::from("/tmp/a"), 100);

        assert_eq!(
            quota.check(&state, 60),
            Err(QuotaExceeded::Session {
                current: 100,
                size: 60,
                limit: 150
            })
        );
        assert_eq!(quota.check(&state, 50), Ok(()));
    }

    /// Pins the relaxed check-then-record accounting: both checks pass before
    /// either download is recorded, and the session ends above its ceiling.
    #[test]
    fn test_check_then_record_race_can_overshoot_session_limit() {
        let quota = ByteQuota::new(100, 150);
        let state = SessionState::new();

        assert!(quota.check(&state, 100).is_ok());
        assert!(quota.check(&state, 100).is_ok());

        state.record_success("https://example.com/a.png", PathBuf::from("/tmp/a"), 100);
        state.record_success("https://example.com/b.png", PathBuf::from("/tmp/b"), 100);

        assert_eq!(state.total_bytes(), 200);
        assert!(state.total_bytes() > quota.max_per_session());
    }

    #[test]
    fn test_quota_exceeded_display() {
        let err = QuotaExceeded::Session {
            current: 10,
            size: 5,
            limit: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("session limit of 12"), "got: {msg}");
    }
}
