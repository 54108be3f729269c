//! Parse one quota screenshot end to end.

use std::path::Path;

use tracing::debug;

use super::extract::extract_json;
use super::types::ParseOutcome;
use super::validate::validate_quota;
use crate::error::QuotaError;
use crate::vision::VisionClient;

/// Send a screenshot to the vision model and validate what comes back.
///
/// A missing image fails with [`QuotaError::NotFound`] before any request is
/// made. Schema problems are not errors: they surface as
/// `ParseOutcome { is_valid: false, .. }`.
pub fn parse_quota_image(
    image: &Path,
    client: &dyn VisionClient,
) -> Result<ParseOutcome, QuotaError> {
    if !image.exists() {
        return Err(QuotaError::NotFound(image.to_path_buf()));
    }

    let response = client.describe_image(image)?;
    debug!("Received {} bytes of model text", response.len());

    let raw = extract_json(&response)?;
    Ok(validate_quota(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::PercentUsed;
    use std::fs;
    use tempfile::TempDir;

    struct CannedClient(&'static str);

    impl VisionClient for CannedClient {
        fn describe_image(&self, _image: &Path) -> Result<String, QuotaError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingClient;

    impl VisionClient for FailingClient {
        fn describe_image(&self, _image: &Path) -> Result<String, QuotaError> {
            Err(QuotaError::Inference("connection refused".to_string()))
        }
    }

    fn screenshot(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("claude_usage_1.png");
        fs::write(&path, b"png").unwrap();
        path
    }

    #[test]
    fn test_missing_image_is_not_found() {
        let err = parse_quota_image(Path::new("/nonexistent/x.png"), &CannedClient("{}"))
            .unwrap_err();
        assert!(matches!(err, QuotaError::NotFound(_)));
    }

    #[test]
    fn test_valid_response() {
        let dir = TempDir::new().unwrap();
        let client = CannedClient(
            "```json\n{\"current_session\": {\"percent_used\": 61, \"resets_in\": \"2 hr\"}, \"weekly_limits\": {\"percent_used\": 33.5, \"resets\": \"Thu\"}}\n```",
        );
        let outcome = parse_quota_image(&screenshot(&dir), &client).unwrap();
        assert!(outcome.is_valid);
        assert_eq!(
            outcome.snapshot.current_session.percent_used,
            Some(PercentUsed::Whole(61))
        );
        assert_eq!(outcome.snapshot.weekly_limits.resets, "Thu");
    }

    #[test]
    fn test_incomplete_response_is_invalid_not_error() {
        let dir = TempDir::new().unwrap();
        let client = CannedClient("{\"current_session\": {\"percent_used\": 10}}");
        let outcome = parse_quota_image(&screenshot(&dir), &client).unwrap();
        assert!(!outcome.is_valid);
    }

    #[test]
    fn test_prose_only_response_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let err = parse_quota_image(&screenshot(&dir), &CannedClient("I can't see it"))
            .unwrap_err();
        assert!(matches!(err, QuotaError::Extraction(_)));
    }

    #[test]
    fn test_client_error_propagates() {
        let dir = TempDir::new().unwrap();
        let err = parse_quota_image(&screenshot(&dir), &FailingClient).unwrap_err();
        assert!(matches!(err, QuotaError::Inference(_)));
    }
}
