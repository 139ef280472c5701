//! Mapping of provider responses onto insight text or typed errors.

use crate::error::AnalysisError;
use serde_json::Value;
use tracing::warn;

const MAX_ERROR_BODY_CHARS: usize = 300;

/// Translate a non-success HTTP status and body into an [`AnalysisError`].
pub fn map_status(status: u16, body: &str) -> AnalysisError {
    let message = error_message(body).unwrap_or_else(|| fallback_message(status, body));
    match status {
        400 => AnalysisError::BadRequest(message),
        401 | 403 => AnalysisError::Unauthorized,
        429 => AnalysisError::RateLimited,
        _ => AnalysisError::UpstreamError { status, message },
    }
}

/// Both providers wrap failures as `{"error": {"message": ...}}`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn fallback_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {status}");
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Parse a successful body into JSON, treating garbage as an upstream fault.
pub fn parse_body(status: u16, body: &str) -> Result<Value, AnalysisError> {
    serde_json::from_str(body).map_err(|e| AnalysisError::UpstreamError {
        status,
        message: format!("invalid JSON response: {e}"),
    })
}

/// First non-empty candidate from a Gemini `generateContent` response.
pub fn gemini_text(value: &Value) -> Result<String, AnalysisError> {
    let text = value
        .get("candidates")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|candidate| candidate.pointer("/content/parts").and_then(Value::as_array))
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .map(|text| text.trim().to_string())
        .find(|text| !text.is_empty());

    text.ok_or_else(|| {
        if let Some(reason) = value
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
        {
            warn!(reason, "Gemini blocked the prompt");
        }
        AnalysisError::EmptyResponse
    })
}

/// First non-empty choice from a chat-completions response.
pub fn chat_completion_text(value: &Value) -> Result<String, AnalysisError> {
    value
        .get("choices")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|choice| choice.pointer("/message/content").and_then(Value::as_str))
        .map(|text| text.trim().to_string())
        .find(|text| !text.is_empty())
        .ok_or(AnalysisError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes_map_to_taxonomy() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            map_status(400, body),
            AnalysisError::BadRequest("API key not valid".into())
        );
        assert_eq!(map_status(401, ""), AnalysisError::Unauthorized);
        assert_eq!(map_status(403, body), AnalysisError::Unauthorized);
        assert_eq!(map_status(429, "slow down"), AnalysisError::RateLimited);
        assert_eq!(
            map_status(503, "upstream overloaded"),
            AnalysisError::UpstreamError {
                status: 503,
                message: "upstream overloaded".into()
            }
        );
        assert_eq!(
            map_status(500, "  "),
            AnalysisError::UpstreamError {
                status: 500,
                message: "HTTP 500".into()
            }
        );
    }

    #[test]
    fn gemini_joins_parts_of_first_non_empty_candidate() {
        let value = json!({
            "candidates": [
                {"content": {"parts": [{"text": "  "}]}},
                {"content": {"parts": [{"text": "## Summary\n"}, {"text": "Body"}]}}
            ]
        });
        assert_eq!(gemini_text(&value), Ok("## Summary\nBody".to_string()));
    }

    #[test]
    fn gemini_without_candidates_is_empty() {
        assert_eq!(gemini_text(&json!({})), Err(AnalysisError::EmptyResponse));
        let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert_eq!(gemini_text(&blocked), Err(AnalysisError::EmptyResponse));
    }

    #[test]
    fn chat_completion_reads_message_content() {
        let value = json!({
            "choices": [{"message": {"role": "assistant", "content": " Insight "}}]
        });
        assert_eq!(chat_completion_text(&value), Ok("Insight".to_string()));
        let empty = json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(chat_completion_text(&empty), Err(AnalysisError::EmptyResponse));
    }

    #[test]
    fn invalid_json_is_upstream_error() {
        assert!(matches!(
            parse_body(200, "<html>"),
            Err(AnalysisError::UpstreamError { status: 200, .. })
        ));
    }
}
