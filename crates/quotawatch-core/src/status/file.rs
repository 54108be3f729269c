//! JSON file output for the status line and the full snapshot.

use anyhow::{Context, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default location of the status-line quota file (`~/.claude/quota-data.json`)
pub fn default_quota_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("quota-data.json")
}

/// Write pretty JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    ensure_parent(path)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
}

/// Write pretty JSON atomically.
///
/// The document goes to `<name>.tmp` beside the target and is renamed over
/// it, so a concurrent reader sees either the old or the new file, never a
/// partial one. The temp file is created with O_CREAT|O_EXCL.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    ensure_parent(path)?;

    let temp_path = temp_path_for(path);

    // Leftover from an interrupted write
    let _ = fs::remove_file(&temp_path);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write temp file: {:?}", temp_path))?;

    file.sync_all()
        .with_context(|| format!("Failed to sync temp file: {:?}", temp_path))?;

    fs::rename(&temp_path, path).with_context(|| format!("Failed to rename into {:?}", path))?;

    Ok(())
}

/// `quota-data.json` -> `quota-data.json.tmp`
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("status"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    Ok(())
}
