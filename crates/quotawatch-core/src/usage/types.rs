//! Quota data types produced by the screenshot parser.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A percentage that passed the 0..=100 range check.
///
/// Integral values keep integer form so they serialize as `42`, not `42.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentUsed {
    /// Integral percentage (e.g. 42)
    Whole(u8),
    /// Fractional percentage (e.g. 10.5)
    Fraction(f64),
}

impl Serialize for PercentUsed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PercentUsed::Whole(n) => serializer.serialize_u8(*n),
            PercentUsed::Fraction(f) => serializer.serialize_f64(*f),
        }
    }
}

/// The "Current session" meter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionUsage {
    /// Percentage used, `None` when missing or invalid
    pub percent_used: Option<PercentUsed>,
    /// Reset description (e.g. "3 hr 12 min"), empty when unknown
    pub resets_in: String,
}

/// The "Weekly limits" meter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeeklyUsage {
    /// Percentage used, `None` when missing or invalid
    pub percent_used: Option<PercentUsed>,
    /// Reset description (e.g. "Thu 9:00 AM"), empty when unknown
    pub resets: String,
}

/// Validated quota data extracted from one screenshot.
///
/// Always fully shaped: a failed extraction yields null percents and empty
/// strings, never missing keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSnapshot {
    /// When this snapshot was produced
    pub captured_at: DateTime<Utc>,
    /// Current session meter
    pub current_session: SessionUsage,
    /// Weekly meter
    pub weekly_limits: WeeklyUsage,
}

impl QuotaSnapshot {
    /// Snapshot with every field empty, stamped with the current time
    pub fn empty() -> Self {
        Self {
            captured_at: Utc::now(),
            current_session: SessionUsage::default(),
            weekly_limits: WeeklyUsage::default(),
        }
    }
}

/// Result of validating raw model output
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    /// The fully-shaped snapshot
    pub snapshot: QuotaSnapshot,
    /// True only when both percentages are present
    pub is_valid: bool,
}

impl ParseOutcome {
    /// Empty, invalid outcome
    pub fn invalid() -> Self {
        Self {
            snapshot: QuotaSnapshot::empty(),
            is_valid: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_percent_serializes_integer_and_fraction() {
        assert_eq!(serde_json::to_value(PercentUsed::Whole(42)).unwrap(), json!(42));
        assert_eq!(
            serde_json::to_value(PercentUsed::Fraction(10.5)).unwrap(),
            json!(10.5)
        );
    }

    #[test]
    fn test_empty_snapshot_is_fully_shaped() {
        let value = serde_json::to_value(QuotaSnapshot::empty()).unwrap();
        assert!(value["captured_at"].is_string());
        assert!(value["current_session"]["percent_used"].is_null());
        assert_eq!(value["current_session"]["resets_in"], json!(""));
        assert!(value["weekly_limits"]["percent_used"].is_null());
        assert_eq!(value["weekly_limits"]["resets"], json!(""));
    }

    #[test]
    fn test_invalid_outcome() {
        let outcome = ParseOutcome::invalid();
        assert!(!outcome.is_valid);
        assert!(outcome.snapshot.current_session.percent_used.is_none());
    }
}
