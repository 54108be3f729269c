//! Disk retention for processed screenshots.
//!
//! Successful screenshots are deleted right away. Failed ones are kept for
//! debugging, but only two of them: the first failure seen and the latest.
//! Cleanup never touches files newer than the screenshot just processed,
//! since the capture process may still be writing them.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{list_matching, ScreenshotPattern};

/// Result of a best-effort delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The file was removed
    Deleted,
    /// The file was already gone
    AlreadyGone,
    /// The delete failed (permissions, busy file, ...)
    Failed(String),
}

/// Delete one screenshot, reporting instead of failing.
pub fn remove_screenshot(path: &Path) -> DeleteOutcome {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted {}", path.display());
            DeleteOutcome::Deleted
        }
        Err(e) if e.kind() == ErrorKind::NotFound => DeleteOutcome::AlreadyGone,
        Err(e) => {
            warn!("Could not delete {}: {}", path.display(), e);
            DeleteOutcome::Failed(e.to_string())
        }
    }
}

/// Summary of one cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files removed
    pub deleted: Vec<PathBuf>,
    /// Files left alone because they are in the keep set
    pub kept: usize,
    /// Files left alone because they are newer than the threshold
    pub skipped_newer: usize,
    /// Files whose delete failed
    pub failed: usize,
}

/// Delete matching screenshots that are not kept and not newer than the
/// threshold.
///
/// With `delete_through_ns = None` every unkept match is deleted. Listing
/// errors and delete failures are logged and reflected in the report only.
pub fn cleanup(
    dir: &Path,
    pattern: &ScreenshotPattern,
    keep: &HashSet<PathBuf>,
    delete_through_ns: Option<i128>,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    let candidates = match list_matching(dir, pattern) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("Cleanup skipped: {:#}", e);
            return report;
        }
    };

    for shot in candidates {
        if keep.contains(&shot.path) {
            report.kept += 1;
            continue;
        }
        if delete_through_ns.is_some_and(|threshold| shot.mtime_ns > threshold) {
            report.skipped_newer += 1;
            continue;
        }
        match remove_screenshot(&shot.path) {
            DeleteOutcome::Deleted => report.deleted.push(shot.path),
            DeleteOutcome::AlreadyGone => {}
            DeleteOutcome::Failed(_) => report.failed += 1,
        }
    }

    report
}

/// The two failure samples kept on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureRetention {
    /// First failed screenshot since the slot was last cleared
    pub first_failed: Option<PathBuf>,
    /// Most recent failed screenshot
    pub last_failed: Option<PathBuf>,
}

impl FailureRetention {
    /// Create an empty retention state
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a failed screenshot
    pub fn record_failure(&mut self, path: PathBuf) {
        if self.first_failed.is_none() {
            self.first_failed = Some(path.clone());
        }
        self.last_failed = Some(path);
    }

    /// Forget slots whose file has disappeared
    pub fn refresh(&mut self) {
        if self.first_failed.as_deref().is_some_and(|p| !p.exists()) {
            self.first_failed = None;
        }
        if self.last_failed.as_deref().is_some_and(|p| !p.exists()) {
            self.last_failed = None;
        }
    }

    /// Paths cleanup must not delete
    pub fn keep_set(&self) -> HashSet<PathBuf> {
        self.first_failed
            .iter()
            .chain(self.last_failed.iter())
            .cloned()
            .collect()
    }
}
