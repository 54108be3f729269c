use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::capture::CaptureProcess;
use crate::error::QuotaError;
use crate::screenshots::{
    cleanup, find_newest, remove_screenshot, FailureRetention, Screenshot, ScreenshotPattern,
};
use crate::status::{write_json_atomic, StatusPayload};
use crate::usage::{parse_quota_image, ParseOutcome};
use crate::vision::VisionClient;

/// Lower bound for the poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Monitor settings
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Directory the capture process writes into
    pub watch_dir: PathBuf,
    /// File-name glob for screenshots
    pub pattern: String,
    /// Sleep between polls (clamped to [`MIN_POLL_INTERVAL`])
    pub poll_interval: Duration,
    /// Status-line quota file
    pub quota_file: PathBuf,
    /// Optional full snapshot output
    pub full_output: Option<PathBuf>,
    /// Process the newest screenshot once and return
    pub once: bool,
}

/// Where the monitor is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Waiting for a new screenshot
    Idle,
    /// Waiting on the vision model
    Parsing,
    /// Writing status files
    Persisting,
    /// Applying retention
    Cleaning,
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No matching screenshot in the watch directory
    NothingFound,
    /// Newest screenshot was already processed
    Unchanged,
    /// A new screenshot was parsed
    Processed {
        /// The screenshot
        image: PathBuf,
        /// Whether the parse validated
        valid: bool,
    },
}

/// Why [`Monitor::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorExit {
    /// One-shot mode processed a screenshot
    Processed,
    /// One-shot mode found nothing to process
    NothingFound,
    /// Shutdown was requested
    Interrupted,
}

/// Watches a directory and keeps the quota status file current
pub struct Monitor {
    config: MonitorConfig,
    pattern: ScreenshotPattern,
    client: Arc<dyn VisionClient>,
    capture: Option<CaptureProcess>,
    retention: FailureRetention,
    /// (path, mtime) of the last processed screenshot
    last_seen: Option<(PathBuf, i128)>,
    phase: MonitorPhase,
}

impl Monitor {
    /// Create a monitor; the watch directory is created if missing
    pub fn new(mut config: MonitorConfig, client: Arc<dyn VisionClient>) -> Result<Self> {
        let pattern = ScreenshotPattern::new(&config.pattern)?;

        std::fs::create_dir_all(&config.watch_dir).with_context(|| {
            format!("Failed to create watch directory: {:?}", config.watch_dir)
        })?;
        config.watch_dir = config
            .watch_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve watch directory: {:?}", config.watch_dir))?;
        config.poll_interval = config.poll_interval.max(MIN_POLL_INTERVAL);

        Ok(Self {
            config,
            pattern,
            client,
            capture: None,
            retention: FailureRetention::new(),
            last_seen: None,
            phase: MonitorPhase::Idle,
        })
    }

    /// Attach a capture process; it is shut down when [`run`](Self::run) returns
    pub fn with_capture(mut self, capture: CaptureProcess) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Resolved watch directory
    pub fn watch_dir(&self) -> &Path {
        &self.config.watch_dir
    }

    /// Current phase
    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    /// Current failure retention state
    pub fn retention(&self) -> &FailureRetention {
        &self.retention
    }

    /// Poll until `shutdown` resolves (or once, in one-shot mode).
    ///
    /// The capture process, if any, is stopped before returning on every path.
    pub async fn run<F>(mut self, shutdown: F) -> MonitorExit
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Watching {} for {}",
            self.config.watch_dir.display(),
            self.pattern.as_str()
        );

        let exit = self.watch(&mut shutdown).await;

        if let Some(capture) = self.capture.take() {
            capture.shutdown().await;
        }

        exit
    }

    async fn watch<F>(&mut self, shutdown: &mut std::pin::Pin<&mut F>) -> MonitorExit
    where
        F: Future<Output = ()>,
    {
        loop {
            let outcome = tokio::select! {
                outcome = self.tick() => outcome,
                _ = shutdown.as_mut() => {
                    info!("Stopped by shutdown request");
                    return MonitorExit::Interrupted;
                }
            };

            if self.config.once {
                return match outcome {
                    TickOutcome::NothingFound => {
                        info!(
                            "No matching screenshots in {}",
                            self.config.watch_dir.display()
                        );
                        MonitorExit::NothingFound
                    }
                    _ => MonitorExit::Processed,
                };
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.as_mut() => {
                    info!("Stopped by shutdown request");
                    return MonitorExit::Interrupted;
                }
            }
        }
    }

    /// Perform a single poll: detect a change and run one full cycle for it
    pub async fn tick(&mut self) -> TickOutcome {
        let newest = match find_newest(&self.config.watch_dir, &self.pattern) {
            Ok(newest) => newest,
            Err(e) => {
                warn!("Screenshot scan failed: {:#}", e);
                None
            }
        };

        let Some(shot) = newest else {
            return TickOutcome::NothingFound;
        };

        let unchanged = self
            .last_seen
            .as_ref()
            .is_some_and(|(path, mtime)| *path == shot.path && *mtime == shot.mtime_ns);
        if unchanged {
            return TickOutcome::Unchanged;
        }

        let valid = self.process(&shot).await;
        TickOutcome::Processed {
            image: shot.path,
            valid,
        }
    }

    /// Parse, persist and clean up after one screenshot. Never fails.
    async fn process(&mut self, shot: &Screenshot) -> bool {
        self.set_phase(MonitorPhase::Parsing);
        let parsed = self.parse_on_worker(&shot.path).await;

        self.set_phase(MonitorPhase::Persisting);
        let valid = match parsed {
            Ok(outcome) => {
                self.persist_status(&StatusPayload::from_outcome(&outcome, Some(&shot.path)));
                self.persist_full_output(&outcome);

                if outcome.is_valid {
                    remove_screenshot(&shot.path);
                } else {
                    self.retention.record_failure(shot.path.clone());
                }
                info!(
                    "Parsed {} ({})",
                    shot.name(),
                    if outcome.is_valid { "ok" } else { "invalid" }
                );
                outcome.is_valid
            }
            Err(e) => {
                self.persist_status(&StatusPayload::from_error(&e, Some(&shot.path)));
                self.retention.record_failure(shot.path.clone());
                warn!("Failed {}: {}", shot.name(), e);
                false
            }
        };

        self.set_phase(MonitorPhase::Cleaning);
        self.retention.refresh();
        let keep = self.retention.keep_set();
        let report = cleanup(
            &self.config.watch_dir,
            &self.pattern,
            &keep,
            Some(shot.mtime_ns),
        );
        debug!(
            "Cleanup: {} deleted, {} kept, {} newer, {} failed",
            report.deleted.len(),
            report.kept,
            report.skipped_newer,
            report.failed
        );

        self.last_seen = Some((shot.path.clone(), shot.mtime_ns));
        self.set_phase(MonitorPhase::Idle);
        valid
    }

    /// Run the blocking inference call on a worker thread
    async fn parse_on_worker(&self, image: &Path) -> Result<ParseOutcome, QuotaError> {
        let client = Arc::clone(&self.client);
        let image = image.to_path_buf();

        tokio::task::spawn_blocking(move || parse_quota_image(&image, client.as_ref()))
            .await
            .map_err(|e| QuotaError::Aborted(e.to_string()))?
    }

    fn persist_status(&self, payload: &StatusPayload) {
        if let Err(e) = write_json_atomic(&self.config.quota_file, payload) {
            error!("Failed to write status file: {:#}", e);
        }
    }

    fn persist_full_output(&self, outcome: &ParseOutcome) {
        if let Some(path) = &self.config.full_output {
            if let Err(e) = write_json_atomic(path, &outcome.snapshot) {
                error!("Failed to write full output: {:#}", e);
            }
        }
    }

    fn set_phase(&mut self, phase: MonitorPhase) {
        debug!("Monitor phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}
