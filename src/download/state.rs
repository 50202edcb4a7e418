//! Shared per-session state: fetched-image cache, failure ledger, byte counter.
//!
//! All three live behind one `std::sync::Mutex`. The lock is only held for
//! the duration of a map or counter update and never across an `.await`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

#[derive(Debug, Default)]
struct SessionInner {
    downloaded: HashMap<String, PathBuf>,
    failed: HashMap<String, String>,
    total_bytes: u64,
}

/// Thread-safe store of fetch outcomes for one processing session.
///
/// A URL is recorded either as downloaded or as failed, never both.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: Mutex<SessionInner>,
}

impl SessionState {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the local path of an already fetched URL.
    #[must_use]
    pub fn cached(&self, url: &str) -> Option<PathBuf> {
        self.lock().downloaded.get(url).cloned()
    }

    /// Records a successful download: cache entry and byte counter move together.
    ///
    /// Any failure previously recorded for the URL is dropped.
    pub fn record_success(&self, url: &str, path: PathBuf, bytes: u64) {
        let mut inner = self.lock();
        inner.failed.remove(url);
        inner.downloaded.insert(url.to_string(), path);
        inner.total_bytes = inner.total_bytes.saturating_add(bytes);
        debug!(url, bytes, total_bytes = inner.total_bytes, "recorded download");
    }

    /// Records a terminal failure unless the URL has already been downloaded.
    pub fn record_failure(&self, url: &str, message: impl Into<String>) {
        let mut inner = self.lock();
        if inner.downloaded.contains_key(url) {
            return;
        }
        inner.failed.insert(url.to_string(), message.into());
    }

    /// Bytes recorded so far in this session.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.lock().total_bytes
    }

    /// Runs `f` against the current byte total while holding the lock.
    pub(crate) fn with_total_bytes<T>(&self, f: impl FnOnce(u64) -> T) -> T {
        f(self.lock().total_bytes)
    }

    /// Snapshot of the URL → local path map.
    #[must_use]
    pub fn downloaded(&self) -> HashMap<String, PathBuf> {
        self.lock().downloaded.clone()
    }

    /// Snapshot of the URL → error message map.
    #[must_use]
    pub fn failures(&self) -> HashMap<String, String> {
        self.lock().failed.clone()
    }

    /// Forgets every download and resets the byte counter, returning the paths
    /// that were recorded. Failures are kept.
    pub(crate) fn clear_downloads(&self) -> Vec<PathBuf> {
        let mut inner = self.lock();
        inner.total_bytes = 0;
        inner.downloaded.drain().map(|(_, path)| path).collect()
    }
}
