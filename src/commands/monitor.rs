use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use quotawatch_core::capture::CaptureProcess;
use quotawatch_core::vision::OllamaClient;
use quotawatch_core::{Monitor, MonitorExit};

use crate::config::Settings;

/// Run the monitor until Ctrl-C, or once with `--once`.
pub async fn run_monitor(settings: &Settings) -> Result<u8> {
    let client = OllamaClient::new(settings.vision_config())?;
    let config = settings.monitor_config()?;
    let quota_file = config.quota_file.clone();

    let mut monitor = Monitor::new(config, Arc::new(client))?;

    if settings.capture.enabled {
        let capture_config = settings.capture_config(monitor.watch_dir());
        let capture = CaptureProcess::spawn(&capture_config)
            .with_context(|| format!("Failed to start capture script {:?}", capture_config.script))?;
        if let Some(pid) = capture.id() {
            info!("Capture process started (pid {})", pid);
        }
        monitor = monitor.with_capture(capture);
    }

    info!(
        "Monitoring {} (quota file: {})",
        monitor.watch_dir().display(),
        quota_file.display()
    );

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler available; run until the process is killed.
            std::future::pending::<()>().await;
        }
    };

    match monitor.run(shutdown).await {
        MonitorExit::NothingFound => info!("No screenshots found"),
        MonitorExit::Processed => {}
        MonitorExit::Interrupted => info!("Stopped"),
    }

    Ok(0)
}
