//! Vision inference collaborator.
//!
//! The core only needs "image in, free text out"; [`VisionClient`] is that
//! seam. [`OllamaClient`] is the production implementation talking to an
//! Ollama-compatible `/api/chat` endpoint.

mod ollama;

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use url::{Host, Url};

use crate::error::QuotaError;

pub use ollama::OllamaClient;

/// Default vision model
pub const DEFAULT_MODEL: &str = "qwen3-vl:235b-cloud";

/// Default inference host
pub const DEFAULT_HOST: &str = "https://ollama.com";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Instruction sent alongside every screenshot
pub const QUOTA_PROMPT: &str = r#"Analyze this Claude.ai usage settings screenshot and extract quota information.

Return ONLY valid JSON with this exact structure:
{
  "current_session": {
    "percent_used": <number>,
    "resets_in": "<time string>"
  },
  "weekly_limits": {
    "percent_used": <number>,
    "resets": "<time string>"
  }
}

If a value is unclear, use null."#;

/// Something that can turn a screenshot into model text.
///
/// Implementations block; the monitor runs them on a blocking worker.
pub trait VisionClient: Send + Sync {
    /// Send the image with [`QUOTA_PROMPT`] and return the raw model text
    fn describe_image(&self, image: &Path) -> Result<String, QuotaError>;
}

/// Settings for the inference request
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Model identifier (e.g. "qwen3-vl:235b-cloud")
    pub model: String,
    /// Base URL of the inference host
    pub host: String,
    /// Bearer token, optional for loopback hosts
    pub api_key: Option<String>,
    /// Timeout for the whole request
    pub timeout: Duration,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            host: DEFAULT_HOST.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Whether the host URL points at this machine
pub fn is_local_host(host: &str) -> bool {
    let Ok(url) = Url::parse(host) else {
        return false;
    };
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        None => false,
    }
}

/// Reject a remote host without credentials before any network call.
pub fn require_api_key(host: &str, api_key: Option<&str>) -> Result<(), QuotaError> {
    let has_key = api_key.is_some_and(|key| !key.is_empty());
    if !is_local_host(host) && !has_key {
        return Err(QuotaError::Configuration(
            "OLLAMA_API_KEY is required for non-local --host".to_string(),
        ));
    }
    Ok(())
}
