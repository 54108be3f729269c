//! Pick the newest screenshot in the watch directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::{regular_file_mtime, Screenshot, ScreenshotPattern};

/// All regular files in `dir` whose name matches `pattern`.
///
/// Sorted by file name so that iteration order (and therefore tie-breaking
/// in [`find_newest`]) does not depend on the platform's directory order.
/// Entries that vanish or cannot be stat'ed mid-scan are skipped.
pub fn list_matching(dir: &Path, pattern: &ScreenshotPattern) -> Result<Vec<Screenshot>> {
    let mut names = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read watch directory: {:?}", dir))?
    {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| pattern.matches(n)) {
            names.push(name);
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .filter_map(|name| {
            let path = dir.join(name);
            let mtime_ns = regular_file_mtime(&path)?;
            Some(Screenshot { path, mtime_ns })
        })
        .collect())
}

/// The matching file with the greatest modification time.
///
/// Comparison is strict, so among equal timestamps the first file in
/// name order wins. `None` when nothing matches.
pub fn find_newest(dir: &Path, pattern: &ScreenshotPattern) -> Result<Option<Screenshot>> {
    let mut newest: Option<Screenshot> = None;
    for shot in list_matching(dir, pattern)? {
        let is_newer = newest
            .as_ref()
            .is_none_or(|current| shot.mtime_ns > current.mtime_ns);
        if is_newer {
            newest = Some(shot);
        }
    }
    Ok(newest)
}
