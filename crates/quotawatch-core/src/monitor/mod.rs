//! Monitor loop: poll the watch directory, parse new screenshots, write the
//! status file and apply retention.
//!
//! One screenshot is in flight at a time. The blocking inference call runs on
//! a worker thread so a shutdown request is honored even mid-request.

mod poller;

pub use poller::{
    Monitor, MonitorConfig, MonitorExit, MonitorPhase, TickOutcome, DEFAULT_POLL_INTERVAL,
    MIN_POLL_INTERVAL,
};
