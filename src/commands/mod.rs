//! Subcommand entry points. Each returns the process exit code.

mod monitor;
mod parse;

pub use monitor::run_monitor;
pub use parse::{emit_snapshot, run_parse};
