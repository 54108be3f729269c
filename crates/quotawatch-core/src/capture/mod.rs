//! External screenshot capture process.
//!
//! The capture script runs independently and drops `claude_usage_*.png`
//! files into the watch directory. We only start it and stop it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::QuotaError;

/// How long to wait for a graceful exit before force-killing
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default capture interval in seconds
pub const DEFAULT_CAPTURE_INTERVAL_SECS: u64 = 60;

/// Default capture script file name
pub const DEFAULT_CAPTURE_SCRIPT: &str = "capture_claude_usage.ps1";

/// How to launch the capture script
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Interpreter (default: "powershell")
    pub program: String,
    /// Script path
    pub script: PathBuf,
    /// Seconds between captures
    pub interval_secs: u64,
    /// Where screenshots are written (the watch directory)
    pub output_dir: PathBuf,
}

impl CaptureConfig {
    /// Arguments passed to the interpreter
    pub fn args(&self) -> Vec<String> {
        vec![
            "-NoProfile".to_string(),
            "-ExecutionPolicy".to_string(),
            "Bypass".to_string(),
            "-File".to_string(),
            self.script.display().to_string(),
            "-IntervalSeconds".to_string(),
            self.interval_secs.to_string(),
            "-OutputDir".to_string(),
            self.output_dir.display().to_string(),
        ]
    }
}

/// A running capture process
pub struct CaptureProcess {
    child: Child,
}

impl CaptureProcess {
    /// Start the capture script
    pub fn spawn(config: &CaptureConfig) -> Result<Self, QuotaError> {
        if !config.script.exists() {
            return Err(QuotaError::NotFound(config.script.clone()));
        }

        let args = config.args();
        info!("Starting capture: {} {}", config.program, args.join(" "));

        let child = Command::new(&config.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        Ok(Self { child })
    }

    /// Wrap an already spawned child
    pub fn from_child(child: Child) -> Self {
        Self { child }
    }

    /// Process ID, if still running
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Terminate, wait up to [`SHUTDOWN_GRACE`], then force-kill.
    pub async fn shutdown(self) {
        self.shutdown_with_grace(SHUTDOWN_GRACE).await
    }

    /// [`shutdown`](Self::shutdown) with a custom grace period
    pub async fn shutdown_with_grace(mut self, grace: Duration) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("Capture process already exited: {}", status);
                return;
            }
            Ok(None) => {}
            Err(e) => warn!("Could not query capture process: {}", e),
        }

        request_terminate(&mut self.child);

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => debug!("Capture process exited: {}", status),
            Ok(Err(e)) => warn!("Waiting for capture process failed: {}", e),
            Err(_) => {
                warn!(
                    "Capture process did not exit within {:?}, killing",
                    grace
                );
                if let Err(e) = self.child.kill().await {
                    warn!("Failed to kill capture process: {}", e);
                }
            }
        }
    }
}

/// Ask the process to exit (SIGTERM on unix)
#[cfg(unix)]
fn request_terminate(child: &mut Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            debug!("SIGTERM to capture process failed: {}", e);
        }
    }
}

/// Ask the process to exit (no graceful signal off unix, so kill directly)
#[cfg(not(unix))]
fn request_terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("Terminating capture process failed: {}", e);
    }
}

/// Default script location: next to the running executable
pub fn default_capture_script() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_CAPTURE_SCRIPT)
}
