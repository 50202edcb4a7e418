//! Best-effort removal of fetched images and the working directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Outcome of a cleanup pass.
///
/// Cleanup never fails; anything that could not be removed is listed in
/// `warnings` (and logged at warn level).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files that were deleted.
    pub removed_files: usize,
    /// Whether the working directory itself was removed.
    pub removed_work_dir: bool,
    /// Non-fatal problems, one human-readable line each.
    pub warnings: Vec<String>,
}

impl CleanupReport {
    /// Returns true when nothing went wrong.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        warn!(%message, "cleanup warning");
        self.warnings.push(message);
    }
}

/// Deletes `files`, then the (now empty) `work_dir`.
///
/// Already-missing files and directories are not reported. A directory that
/// still holds other files is left in place with a warning.
pub(crate) async fn remove_session_files(files: &[PathBuf], work_dir: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    for path in files {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed fetched image");
                report.removed_files += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => report.warn(format!("failed to remove {}: {e}", path.display())),
        }
    }

    match tokio::fs::remove_dir(work_dir).await {
        Ok(()) => {
            debug!(path = %work_dir.display(), "removed working directory");
            report.removed_work_dir = true;
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => report.warn(format!(
            "failed to remove working directory {}: {e}",
            work_dir.display()
        )),
    }

    report
}
