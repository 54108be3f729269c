//! Quota extraction: recover, validate and type the vision model's answer.
//!
//! The model is asked to read a Claude usage screenshot and answer with JSON.
//! [`extract`] digs that JSON out of whatever text came back, [`validate`]
//! turns it into a fully-shaped [`QuotaSnapshot`], and [`parser`] ties both
//! to a [`crate::vision::VisionClient`].

pub mod extract;
pub mod parser;
pub mod types;
pub mod validate;

pub use extract::{extract_json, strip_thinking_tags};
pub use parser::parse_quota_image;
pub use types::{ParseOutcome, PercentUsed, QuotaSnapshot, SessionUsage, WeeklyUsage};
pub use validate::validate_quota;
