//! quotawatch-core: turn Claude usage screenshots into a status-line quota file.
//!
//! Pipeline: [`monitor`] finds the newest screenshot ([`screenshots`]), sends
//! it to a vision model ([`vision`]), recovers and validates the JSON answer
//! ([`usage`]), writes the status file ([`status`]) and then applies the
//! retention policy. [`capture`] optionally runs the external process that
//! produces the screenshots.

pub mod capture;
pub mod error;
pub mod monitor;
pub mod screenshots;
pub mod status;
pub mod usage;
pub mod vision;

pub use error::{ExtractionError, QuotaError};
pub use monitor::{Monitor, MonitorConfig, MonitorExit};
pub use usage::{ParseOutcome, QuotaSnapshot};
