//! Remote image download pipeline.
//!
//! This module fetches the remote images referenced by a markdown document
//! into a working directory, with bounded concurrency, retry of transient
//! failures, byte quotas and best-effort cleanup.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large images)
//! - Per-request timeout (10s by default)
//! - Session cache: each URL is fetched at most once per session
//! - Per-image and per-session byte quotas
//! - Failures recorded as data, never aborting the document
//!
//! # Example
//!
//! ```no_run
//! use mdpdf_core::download::ImageProcessor;
//! use mdpdf_core::FetchConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let processor = ImageProcessor::new(FetchConfig::default(), "./images")?;
//! let text = processor
//!     .process_document("![chart](https://example.com/chart.png)")
//!     .await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

mod cleanup;
mod client;
pub mod constants;
mod engine;
mod error;
mod filename;
mod quota;
mod retry;
mod state;

pub use cleanup::CleanupReport;
pub use client::{FetchedImage, HttpClient};
pub use constants::{DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES};
pub use engine::{FetchCounts, FetchStats, ImageProcessor};
pub use error::{FetchError, ProcessError};
pub use quota::{ByteQuota, QuotaExceeded};
pub use retry::{FailureType, RetryDecision, RetryPolicy, classify_error, is_transient};
pub use state::SessionState;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, FetchError>` explicitly in function signatures.
