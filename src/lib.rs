//! quotawatch: read Claude usage screenshots with a vision model and keep a
//! small quota status file up to date.
//!
//! The heavy lifting lives in `quotawatch-core`; this crate holds the
//! command line, settings and the two subcommands.

pub mod commands;
pub mod config;
