//! Image processor: concurrent fetching of every remote image in a document.
//!
//! This module provides the [`ImageProcessor`] which extracts remote image
//! URLs from a markdown document, fetches them concurrently using a
//! semaphore-based concurrency limit, retries transient failures with
//! jittered backoff, and rewrites the document to point at the local copies.
//!
//! # Example
//!
//! ```no_run
//! use mdpdf_core::{FetchConfig, ImageProcessor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let processor = ImageProcessor::new(FetchConfig::default(), "./.mdpdf-images")?;
//! let markdown = "![logo](https://example.com/logo.png)";
//! let localized = processor.process_document(markdown).await?;
//! for (url, reason) in processor.failures() {
//!     eprintln!("{url}: {reason}");
//! }
//! println!("{localized}");
//! processor.cleanup().await;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::cleanup::{CleanupReport, remove_session_files};
use super::client::{FetchedImage, HttpClient};
use super::error::{FetchError, ProcessError};
use super::quota::ByteQuota;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::state::SessionState;
use crate::config::{ConfigError, FetchConfig};
use crate::markdown::{extract_remote_image_urls, rewrite_image_urls};

/// Statistics from image fetching.
///
/// Uses atomic counters for thread-safe updates from concurrent fetch tasks.
/// Counters accumulate over every `process_document` call of a processor.
#[derive(Debug, Default)]
pub struct FetchStats {
    fetched: AtomicUsize,
    cached: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl FetchStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Images downloaded over the network.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }

    /// Images served from the session cache.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cached.load(Ordering::SeqCst)
    }

    /// Images that ended in a terminal failure.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Retry attempts made.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> FetchCounts {
        FetchCounts {
            fetched: self.fetched(),
            cached: self.cached(),
            failed: self.failed(),
            retried: self.retried(),
        }
    }

    fn record_outcome(&self, fetched: &FetchedImage) {
        if fetched.cached {
            self.cached.fetch_add(1, Ordering::SeqCst);
        } else {
            self.fetched.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }
}

/// Plain counter values taken from [`FetchStats::snapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCounts {
    /// Images downloaded over the network.
    pub fetched: usize,
    /// Images served from the session cache.
    pub cached: usize,
    /// Images that ended in a terminal failure.
    pub failed: usize,
    /// Retry attempts made.
    pub retried: usize,
}

impl FetchCounts {
    /// Counts accumulated since `earlier` was taken.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            fetched: self.fetched.saturating_sub(earlier.fetched),
            cached: self.cached.saturating_sub(earlier.cached),
            failed: self.failed.saturating_sub(earlier.failed),
            retried: self.retried.saturating_sub(earlier.retried),
        }
    }
}

/// Fetches the remote images of markdown documents into a working directory.
///
/// # Concurrency Model
///
/// - Each unique URL is fetched in its own Tokio task
/// - A semaphore permit is acquired before spawning each task
/// - `process_document` waits for every task before rewriting
/// - The [`SessionState`] lock is never held across network I/O
///
/// # Failure Model
///
/// Individual image failures never fail `process_document`; they are
/// recorded in [`failures`](Self::failures). Only an uncreatable working
/// directory is returned as an error.
#[derive(Debug)]
pub struct ImageProcessor {
    work_dir: PathBuf,
    client: HttpClient,
    retry_policy: RetryPolicy,
    quota: ByteQuota,
    concurrency: usize,
    semaphore: Arc<Semaphore>,
    state: Arc<SessionState>,
    stats: Arc<FetchStats>,
}

impl ImageProcessor {
    /// Creates a processor from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is out of range or the
    /// HTTP client cannot be built.
    #[instrument(level = "debug", skip(config, work_dir))]
    pub fn new(config: FetchConfig, work_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        config.validate()?;
        let client =
            HttpClient::try_new(config.request_timeout()).map_err(ConfigError::HttpClient)?;
        Ok(Self::with_parts(
            &config,
            work_dir,
            client,
            RetryPolicy::new(config.max_retries),
        ))
    }

    /// Creates a processor with an explicit client and retry policy.
    ///
    /// The configuration is validated the same way as in [`new`](Self::new).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is out of range.
    pub fn with_client(
        config: FetchConfig,
        work_dir: impl Into<PathBuf>,
        client: HttpClient,
        retry_policy: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_parts(&config, work_dir, client, retry_policy))
    }

    fn with_parts(
        config: &FetchConfig,
        work_dir: impl Into<PathBuf>,
        client: HttpClient,
        retry_policy: RetryPolicy,
    ) -> Self {
        let work_dir = work_dir.into();
        debug!(
            work_dir = %work_dir.display(),
            concurrency = config.max_concurrent_downloads,
            max_attempts = retry_policy.max_attempts(),
            timeout_secs = config.request_timeout_secs,
            "creating image processor"
        );
        Self {
            work_dir,
            client,
            retry_policy,
            quota: config.quota(),
            concurrency: config.max_concurrent_downloads,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_downloads)),
            state: Arc::new(SessionState::new()),
            stats: Arc::new(FetchStats::new()),
        }
    }

    /// Working directory that receives fetched images.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Shared session state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Fetch counters.
    #[must_use]
    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Snapshot of successfully fetched images (URL → local path).
    #[must_use]
    pub fn downloaded(&self) -> HashMap<String, PathBuf> {
        self.state.downloaded()
    }

    /// Snapshot of terminal failures (URL → reason).
    #[must_use]
    pub fn failures(&self) -> HashMap<String, String> {
        self.state.failures()
    }

    /// Fetches every remote image of `text` and returns the rewritten document.
    ///
    /// This method:
    /// 1. Creates the working directory
    /// 2. Extracts unique remote image URLs (returns `text` unchanged if none)
    /// 3. Spawns one fetch task per URL, up to the concurrency limit
    /// 4. Waits for all tasks to complete
    /// 5. Rewrites fetched URLs to their local paths
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::WorkDir`] if the working directory cannot be
    /// created, and [`ProcessError::SemaphoreClosed`] if the semaphore is
    /// closed; tasks spawned before that are still awaited. Individual image
    /// failures do NOT cause this method to error.
    #[instrument(skip(self, text), fields(work_dir = %self.work_dir.display(), text_len = text.len()))]
    pub async fn process_document(&self, text: &str) -> Result<String, ProcessError> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|source| ProcessError::WorkDir {
                path: self.work_dir.clone(),
                source,
            })?;

        let urls = extract_remote_image_urls(text);
        if urls.is_empty() {
            debug!("no remote images");
            return Ok(text.to_string());
        }

        info!(images = urls.len(), "fetching remote images");
        let before = self.stats.snapshot();

        let mut handles = Vec::with_capacity(urls.len());
        let mut semaphore_closed = false;
        for url in urls {
            let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                warn!(url = %url, "semaphore closed, no further fetches spawned");
                semaphore_closed = true;
                break;
            };

            let client = self.client.clone();
            let policy = self.retry_policy.clone();
            let state = Arc::clone(&self.state);
            let stats = Arc::clone(&self.stats);
            let work_dir = self.work_dir.clone();
            let quota = self.quota;
            let task_url = url.clone();

            let handle = tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;

                match fetch_with_retry(&client, &task_url, &work_dir, &state, &quota, &policy, &stats)
                    .await
                {
                    Ok(fetched) => stats.record_outcome(&fetched),
                    Err((e, attempts)) => {
                        warn!(url = %task_url, error = %e, attempts, "image fetch failed");
                        state.record_failure(&task_url, e.to_string());
                        stats.increment_failed();
                    }
                }
            });
            handles.push((url, handle));
        }

        debug!(task_count = handles.len(), "waiting for fetches to complete");

        for (url, handle) in handles {
            if let Err(e) = handle.await {
                warn!(url = %url, error = %e, "fetch task panicked");
                self.state
                    .record_failure(&url, format!("fetch task aborted: {e}"));
                self.stats.increment_failed();
            }
        }

        if semaphore_closed {
            return Err(ProcessError::SemaphoreClosed);
        }

        let downloaded = self.state.downloaded();
        let rewritten = rewrite_image_urls(text, &downloaded);

        // Per-document deltas; concurrent calls on one processor may overlap
        let counts = self.stats.snapshot().since(&before);
        info!(
            fetched = counts.fetched,
            cached = counts.cached,
            failed = counts.failed,
            retried = counts.retried,
            session_bytes = self.state.total_bytes(),
            "remote image processing complete"
        );

        Ok(rewritten)
    }

    /// Removes every fetched file and the working directory.
    ///
    /// Never fails; problems are reported as warnings in the returned report.
    /// Afterwards the download cache is empty and the failure ledger is kept.
    #[instrument(skip(self), fields(work_dir = %self.work_dir.display()))]
    pub async fn cleanup(&self) -> CleanupReport {
        let paths = self.state.clear_downloads();
        remove_session_files(&paths, &self.work_dir).await
    }
}

/// Fetches one image with retry logic for transient errors.
///
/// Attempts are strictly sequential. A permanent error or an exhausted
/// budget ends the loop immediately.
///
/// # Returns
///
/// - `Ok(FetchedImage)` on the first successful attempt
/// - `Err((FetchError, u32))` - last error and total attempt count on failure
#[instrument(skip(client, work_dir, state, quota, policy, stats), fields(url = %url))]
pub(crate) async fn fetch_with_retry(
    client: &HttpClient,
    url: &str,
    work_dir: &Path,
    state: &SessionState,
    quota: &ByteQuota,
    policy: &RetryPolicy,
    stats: &FetchStats,
) -> Result<FetchedImage, (FetchError, u32)> {
    let mut attempt = 0u32;

    loop {
        debug!(attempt, "attempting fetch");

        match client.fetch_once(url, work_dir, state, quota).await {
            Ok(fetched) => return Ok(fetched),
            Err(e) => match policy.should_retry(classify_error(&e), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: retry,
                } => {
                    info!(
                        url = %url,
                        retry,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying image fetch"
                    );
                    stats.increment_retried();
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %url, %reason, "not retrying image fetch");
                    return Err((e, attempt + 1));
                }
            },
        }
    }
}
