//! Schema validation for raw model output.
//!
//! This is the trust boundary: everything downstream consumes only
//! [`ParseOutcome`] values produced here.

use serde_json::Value;

use super::types::{ParseOutcome, PercentUsed, QuotaSnapshot};

/// Validate a raw JSON value into a fully-shaped snapshot.
///
/// Never fails. Missing sections, out-of-range or non-numeric percentages
/// degrade to null fields and mark the outcome invalid.
pub fn validate_quota(raw: &Value) -> ParseOutcome {
    let mut snapshot = QuotaSnapshot::empty();
    let mut is_valid = true;

    let Some(root) = raw.as_object() else {
        return ParseOutcome {
            snapshot,
            is_valid: false,
        };
    };

    match root.get("current_session").and_then(Value::as_object) {
        Some(current) => {
            let pct = validate_percent(current.get("percent_used"));
            snapshot.current_session.percent_used = pct;
            snapshot.current_session.resets_in = validate_string(current.get("resets_in"));
            is_valid &= pct.is_some();
        }
        None => is_valid = false,
    }

    match root.get("weekly_limits").and_then(Value::as_object) {
        Some(weekly) => {
            let pct = validate_percent(weekly.get("percent_used"));
            snapshot.weekly_limits.percent_used = pct;
            snapshot.weekly_limits.resets = validate_string(weekly.get("resets"));
            is_valid &= pct.is_some();
        }
        None => is_valid = false,
    }

    ParseOutcome { snapshot, is_valid }
}

/// Coerce a value to a percentage in `0..=100`.
///
/// Numbers, numeric strings and booleans coerce to float; anything else,
/// NaN, or a value outside the range yields `None`.
pub fn validate_percent(value: Option<&Value>) -> Option<PercentUsed> {
    let num = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };

    if !(0.0..=100.0).contains(&num) {
        return None;
    }

    if num.fract() == 0.0 {
        Some(PercentUsed::Whole(num as u8))
    } else {
        Some(PercentUsed::Fraction(num))
    }
}

/// Pass strings through; everything else becomes an empty string.
pub fn validate_string(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}
