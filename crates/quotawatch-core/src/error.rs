//! Error types shared across the quota pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// No JSON value could be recovered from a model response
#[derive(Debug, Error)]
#[error("could not recover JSON from model response: {0}")]
pub struct ExtractionError(#[from] pub serde_json::Error);

/// Error type for parsing a quota screenshot
#[derive(Debug, Error)]
pub enum QuotaError {
    /// Missing or unusable configuration (e.g. no API key for a remote host)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The image (or capture script) does not exist
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The model answered but no JSON could be recovered from the text
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The inference request failed (transport, HTTP status, timeout, bad envelope)
    #[error("inference request failed: {0}")]
    Inference(String),

    /// The background parse task panicked or was cancelled
    #[error("parse task aborted: {0}")]
    Aborted(String),

    /// Local filesystem error (reading the image, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ureq::Error> for QuotaError {
    fn from(err: ureq::Error) -> Self {
        QuotaError::Inference(err.to_string())
    }
}
