//! Ollama `/api/chat` client.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::debug;

use super::{require_api_key, VisionClient, VisionConfig, QUOTA_PROMPT};
use crate::error::QuotaError;

/// Blocking client for an Ollama-compatible chat endpoint
pub struct OllamaClient {
    config: VisionConfig,
    agent: ureq::Agent,
}

impl OllamaClient {
    /// Create a client, failing fast when a remote host has no API key
    pub fn new(config: VisionConfig) -> Result<Self, QuotaError> {
        require_api_key(&config.host, config.api_key.as_deref())?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();

        Ok(Self { config, agent })
    }

    /// Chat endpoint URL for the configured host
    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.config.host.trim_end_matches('/'))
    }
}

impl VisionClient for OllamaClient {
    fn describe_image(&self, image: &Path) -> Result<String, QuotaError> {
        let bytes = fs::read(image)?;
        let body = build_chat_request(&self.config.model, &BASE64.encode(bytes));

        let endpoint = self.endpoint();
        debug!("POST {} (model {})", endpoint, self.config.model);

        let mut request = self.agent.post(&endpoint);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let mut response = request.send_json(&body)?;
        let envelope: Value = response.body_mut().read_json()?;

        Ok(response_text(&envelope))
    }
}

/// Build the non-streaming chat request body
fn build_chat_request(model: &str, image_base64: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            {
                "role": "user",
                "content": QUOTA_PROMPT,
                "images": [image_base64],
            }
        ],
        "stream": false,
        "options": {"temperature": 0.0},
    })
}

/// Model text from the response envelope.
///
/// Prefers `message.content`, falls back to top-level `response`, else empty.
fn response_text(envelope: &Value) -> String {
    let content = envelope
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());

    content
        .or_else(|| envelope.get("response").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_chat_request_shape() {
        let body = build_chat_request("qwen3-vl", "aGVsbG8=");
        assert_eq!(body["model"], "qwen3-vl");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.0);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], QUOTA_PROMPT);
        assert_eq!(body["messages"][0]["images"][0], "aGVsbG8=");
    }

    #[test]
    fn test_response_text_prefers_message_content() {
        let envelope = json!({"message": {"content": "{\"a\":1}"}, "response": "other"});
        assert_eq!(response_text(&envelope), "{\"a\":1}");
    }

    #[test]
    fn test_response_text_falls_back_to_response() {
        let envelope = json!({"message": {"content": ""}, "response": "generate-style"});
        assert_eq!(response_text(&envelope), "generate-style");

        let envelope = json!({"response": "only response"});
        assert_eq!(response_text(&envelope), "only response");
    }

    #[test]
    fn test_response_text_empty_envelope() {
        assert_eq!(response_text(&json!({})), "");
        assert_eq!(response_text(&json!({"message": {"content": 5}})), "");
    }

    #[test]
    fn test_remote_host_without_key_is_rejected() {
        let config = VisionConfig {
            host: "https://ollama.com".to_string(),
            api_key: None,
            ..Default::default()
        };
        assert!(matches!(
            OllamaClient::new(config),
            Err(QuotaError::Configuration(_))
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = VisionConfig {
            host: "http://localhost:11434/".to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let client = OllamaClient::new(config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_missing_image_is_io_error() {
        let config = VisionConfig {
            host: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let client = OllamaClient::new(config).unwrap();
        let err = client
            .describe_image(Path::new("/nonexistent/quota.png"))
            .unwrap_err();
        assert!(matches!(err, QuotaError::Io(_)));
    }
}
