//! Recover a JSON object from a free-text vision model response.
//!
//! Models wrap the payload in prose, markdown fences or reasoning blocks and
//! sometimes leave trailing commas. Attempts run in order, first success wins:
//!
//! 1. fenced ```` ```json {...} ``` ```` block
//! 2. the first balanced `{...}` span (brace-depth walk)
//! 3. the same span with trailing commas removed
//! 4. the whole cleaned text

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::ExtractionError;

static THINK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<think>.*?</think>").expect("Invalid think pattern")
});

static THINKING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<thinking>.*?</thinking>").expect("Invalid thinking pattern")
});

static FENCED_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("Invalid fenced JSON pattern")
});

static TRAILING_COMMA_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\}").expect("Invalid trailing comma pattern"));

static TRAILING_COMMA_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\]").expect("Invalid trailing comma pattern"));

/// Remove `<think>` / `<thinking>` blocks (with their contents) and trim.
pub fn strip_thinking_tags(text: &str) -> String {
    let cleaned = THINK_TAG.replace_all(text, "");
    let cleaned = THINKING_TAG.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Extract the first JSON value from a model response.
pub fn extract_json(text: &str) -> Result<Value, ExtractionError> {
    let text = strip_thinking_tags(text);
    debug!("Model response:\n{}", text);

    if let Some(captures) = FENCED_OBJECT.captures(&text) {
        if let Ok(value) = serde_json::from_str(&captures[1]) {
            return Ok(value);
        }
    }

    if let Some(candidate) = balanced_object(&text) {
        if let Ok(value) = serde_json::from_str(candidate) {
            return Ok(value);
        }
        if let Ok(value) = serde_json::from_str(&strip_trailing_commas(candidate)) {
            return Ok(value);
        }
    }

    Ok(serde_json::from_str(&text)?)
}

/// Span from the first `{` to its matching `}`, if the braces balance.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth: usize = 0;

    for (index, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + index]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Drop commas that directly precede a closing `}` or `]`.
fn strip_trailing_commas(candidate: &str) -> String {
    let repaired = TRAILING_COMMA_OBJECT.replace_all(candidate, "}");
    TRAILING_COMMA_ARRAY
        .replace_all(&repaired, "]")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_clean_json_is_returned_unchanged() {
        let value = json!({
            "current_session": {"percent_used": 42, "resets_in": "3h"},
            "weekly_limits": {"percent_used": 10.5, "resets": "2d"}
        });
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(extract_json(&text).unwrap(), value);
    }

    #[test]
    fn test_brace_inside_string_falls_back_to_whole_text() {
        let value = json!({"current_session": {"percent_used": 5, "resets_in": "}"}});
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(extract_json(&text).unwrap(), value);
    }

    #[test]
    fn test_thinking_block_is_ignored_in_favor_of_fence() {
        let text = r#"<think>
The meter says {"current_session": {"percent_used": 99}} maybe?
</think>
Here you go:
```json
{"current_session": {"percent_used": 12, "resets_in": "1h"}}
```"#;
        assert_eq!(
            extract_json(text).unwrap(),
            json!({"current_session": {"percent_used": 12, "resets_in": "1h"}})
        );
    }

    #[test]
    fn test_thinking_tags_are_case_insensitive() {
        let text = "<THINKING>{\"bogus\": true}</Thinking> {\"ok\": 1}";
        assert_eq!(strip_thinking_tags(text), "{\"ok\": 1}");
        assert_eq!(extract_json(text).unwrap(), json!({"ok": 1}));
    }

    #[test]
    fn test_fence_without_language_tag() {
        let text = "```\n{\"a\": {\"b\": 2}}\n```";
        assert_eq!(extract_json(text).unwrap(), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_object_wrapped_in_prose_with_nesting() {
        let text = r#"Sure! The data is {"current_session": {"percent_used": 5}, "weekly_limits": {"percent_used": 7}} as requested. {"ignored": true}"#;
        assert_eq!(
            extract_json(text).unwrap(),
            json!({"current_session": {"percent_used": 5}, "weekly_limits": {"percent_used": 7}})
        );
    }

    #[test]
    fn test_trailing_commas_are_repaired() {
        let text = "Result:\n{\"weekly_limits\": {\"percent_used\": 30, \"resets\": \"Mon\",}, \"tags\": [1, 2,],}";
        assert_eq!(
            extract_json(text).unwrap(),
            json!({"weekly_limits": {"percent_used": 30, "resets": "Mon"}, "tags": [1, 2]})
        );
    }

    #[test]
    fn test_broken_fence_falls_back_to_brace_walk() {
        let text = "```json\n{\"a\": 1,}\n```";
        assert_eq!(extract_json(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_whole_text_fallback_without_braces() {
        assert_eq!(extract_json("  [1, 2, 3]  ").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        assert!(extract_json("{\"current_session\": {\"percent_used\": 4}").is_err());
    }

    #[test]
    fn test_no_json_fails() {
        assert!(extract_json("I could not read the screenshot.").is_err());
        assert!(extract_json("").is_err());
    }

    #[test]
    fn test_unrepairable_span_fails() {
        assert!(extract_json("{percent_used: forty}").is_err());
    }

    #[test]
    fn test_balanced_object_span() {
        assert_eq!(balanced_object("x {a {b} c} y"), Some("{a {b} c}"));
        assert_eq!(balanced_object("no braces"), None);
        assert_eq!(balanced_object("{ open"), None);
    }
}
