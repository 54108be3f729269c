//! Screenshot discovery and disk retention for the watch directory.

pub mod retention;
pub mod selector;

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};

pub use retention::{cleanup, remove_screenshot, CleanupReport, DeleteOutcome, FailureRetention};
pub use selector::{find_newest, list_matching};

/// Default screenshot file name pattern
pub const DEFAULT_PATTERN: &str = "claude_usage_*.png";

/// One candidate image in the watch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    /// Full path (watch directory joined with the file name)
    pub path: PathBuf,
    /// Modification time in nanoseconds since the Unix epoch
    pub mtime_ns: i128,
}

impl Screenshot {
    /// File name for log lines
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Compiled file-name glob (e.g. `claude_usage_*.png`)
#[derive(Debug, Clone)]
pub struct ScreenshotPattern {
    raw: String,
    matcher: GlobMatcher,
}

impl ScreenshotPattern {
    /// Compile a glob; matched against file names only
    pub fn new(pattern: &str) -> Result<Self> {
        let glob =
            Glob::new(pattern).with_context(|| format!("Invalid screenshot pattern: {}", pattern))?;
        Ok(Self {
            raw: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// The pattern as given
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether a file name matches
    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }
}

/// Modification time in nanoseconds (negative before the epoch)
pub fn mtime_ns(metadata: &Metadata) -> io::Result<i128> {
    let modified = metadata.modified()?;
    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as i128,
        Err(before) => -(before.duration().as_nanos() as i128),
    })
}

/// Regular file (symlinks followed) and its mtime, or `None`
pub(crate) fn regular_file_mtime(path: &Path) -> Option<i128> {
    let metadata = fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    mtime_ns(&metadata).ok()
}
