use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, warn};

use quotawatch_core::status::write_json;
use quotawatch_core::usage::parse_quota_image;
use quotawatch_core::vision::OllamaClient;
use quotawatch_core::{ParseOutcome, QuotaError, QuotaSnapshot};

use crate::config::{ParseArgs, Settings};

/// Parse a single screenshot.
///
/// Exit code 0 means both percentages were read. On any failure an empty
/// snapshot is still emitted so downstream readers see a well-formed file.
pub fn run_parse(settings: &Settings, args: &ParseArgs) -> Result<u8> {
    match parse_image(settings, &args.image) {
        Ok(outcome) => {
            emit_snapshot(&outcome.snapshot, args.output.as_deref())?;
            if !outcome.is_valid {
                warn!("Screenshot did not yield both percentages");
            }
            Ok(if outcome.is_valid { 0 } else { 1 })
        }
        Err(e) => {
            error!("{}", e);
            emit_snapshot(&QuotaSnapshot::empty(), args.output.as_deref())?;
            Ok(1)
        }
    }
}

/// Missing images are reported before any credential problem
fn parse_image(settings: &Settings, image: &Path) -> Result<ParseOutcome, QuotaError> {
    if !image.exists() {
        return Err(QuotaError::NotFound(image.to_path_buf()));
    }
    let client = OllamaClient::new(settings.vision_config())?;
    parse_quota_image(image, &client)
}

/// Write the snapshot to `output`, or pretty-print it to stdout
pub fn emit_snapshot(snapshot: &QuotaSnapshot, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => write_json(path, snapshot),
        None => {
            let json =
                serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
            println!("{}", json);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelArgs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn local_settings() -> Settings {
        let mut settings = Settings::default();
        settings.vision.host = "http://127.0.0.1:9".to_string();
        settings.vision.timeout_secs = 1;
        settings
    }

    #[test]
    fn test_missing_image_writes_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.json");
        let args = ParseArgs {
            image: PathBuf::from("/nonexistent/claude_usage_1.png"),
            output: Some(output.clone()),
            model: ModelArgs::default(),
        };

        let code = run_parse(&local_settings(), &args).unwrap();
        assert_eq!(code, 1);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert!(written["current_session"]["percent_used"].is_null());
        assert_eq!(written["weekly_limits"]["resets"], "");
    }

    #[test]
    fn test_missing_image_reported_before_missing_api_key() {
        let mut settings = Settings::default();
        settings.vision.api_key = None;

        let result = parse_image(&settings, Path::new("/nonexistent/claude_usage_1.png"));
        assert!(matches!(result, Err(QuotaError::NotFound(_))));
    }

    #[test]
    fn test_missing_api_key_is_an_error_exit() {
        temp_env::with_var_unset("OLLAMA_API_KEY", || {
            let dir = TempDir::new().unwrap();
            let image = dir.path().join("claude_usage_1.png");
            std::fs::write(&image, b"png").unwrap();
            let output = dir.path().join("out.json");

            let mut settings = Settings::default();
            settings.vision.api_key = None;
            let args = ParseArgs {
                image,
                output: Some(output.clone()),
                model: ModelArgs::default(),
            };

            assert_eq!(run_parse(&settings, &args).unwrap(), 1);
            assert!(output.exists());
        });
    }
}
