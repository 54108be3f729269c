//! Status artifacts consumed outside this process.

mod file;
mod payload;

pub use file::{default_quota_file, write_json, write_json_atomic};
pub use payload::StatusPayload;
