//! Compact status document read by the status line.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::usage::{ParseOutcome, PercentUsed};

/// Status written to `~/.claude/quota-data.json` after every parse.
///
/// Rebuilt from scratch each cycle; never merged with the previous file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPayload {
    /// Current session percentage
    pub quota_used_pct: Option<PercentUsed>,
    /// Weekly percentage
    pub weekly_used_pct: Option<PercentUsed>,
    /// Current session reset description
    pub resets_in: String,
    /// Weekly reset description
    pub weekly_resets: String,
    /// When this payload was built
    pub updated: DateTime<Utc>,
    /// Whether both percentages validated
    pub valid: bool,
    /// File name of the screenshot this came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
    /// Error from the parse attempt, if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusPayload {
    /// Payload for a completed parse (valid or not)
    pub fn from_outcome(outcome: &ParseOutcome, source_image: Option<&Path>) -> Self {
        let snapshot = &outcome.snapshot;
        Self {
            quota_used_pct: snapshot.current_session.percent_used,
            weekly_used_pct: snapshot.weekly_limits.percent_used,
            resets_in: snapshot.current_session.resets_in.clone(),
            weekly_resets: snapshot.weekly_limits.resets.clone(),
            updated: Utc::now(),
            valid: outcome.is_valid,
            source_image: source_image.and_then(file_name),
            error: None,
        }
    }

    /// Payload for a parse that failed outright
    pub fn from_error(error: impl ToString, source_image: Option<&Path>) -> Self {
        let error = error.to_string();
        Self {
            quota_used_pct: None,
            weekly_used_pct: None,
            resets_in: String::new(),
            weekly_resets: String::new(),
            updated: Utc::now(),
            valid: false,
            source_image: source_image.and_then(file_name),
            error: (!error.is_empty()).then_some(error),
        }
    }
}

/// Basename only; the status line has no use for the watch directory
fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}
