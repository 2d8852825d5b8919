//! Defensive response-body handling shared by the client executor and the upstream adapter.
//!
//! Bodies are always read as text first and only then parsed, so an empty,
//! truncated or HTML body becomes a classified failure instead of a decode error
//! halfway through a stream.

use serde_json::Value;

/// Outcome of parsing a response body that did not yield a usable JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyFailure {
    /// Body is not JSON and looks like markup (starts with `<`).
    Markup { status: u16, raw: String },
    /// Body is neither JSON nor markup.
    Malformed { status: u16, raw: String },
    /// Body parsed, but the status code is outside the success range.
    Rejected { status: u16, body: Value },
}

/// Parse a raw response body, classifying failures.
///
/// The text is trimmed before parsing; markup detection uses the trimmed text.
pub fn parse_response_body(status: u16, raw: &str) -> Result<Value, BodyFailure> {
    let trimmed = raw.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(body) if is_success(status) => Ok(body),
        Ok(body) => Err(BodyFailure::Rejected { status, body }),
        Err(_) if trimmed.starts_with('<') => Err(BodyFailure::Markup {
            status,
            raw: raw.to_string(),
        }),
        Err(_) => Err(BodyFailure::Malformed {
            status,
            raw: raw.to_string(),
        }),
    }
}

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// First `max_chars` characters of `text`, never splitting a UTF-8 sequence.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `error` (a string, or an object carrying `message` as in the v6
/// envelope), then `error_message`, then `message`.
pub fn error_message(body: &Value) -> Option<String> {
    let from_error = match body.get("error") {
        Some(Value::String(text)) => Some(text.as_str()),
        Some(Value::Object(object)) => object.get("message").and_then(Value::as_str),
        _ => None,
    };

    from_error
        .or_else(|| body.get("error_message").and_then(Value::as_str))
        .or_else(|| body.get("message").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_with_surrounding_whitespace() {
        let body = parse_response_body(200, "  {\"data\": []}\n\n").unwrap();
        assert_eq!(body, json!({"data": []}));
    }

    #[test]
    fn html_body_is_markup_even_on_success_status() {
        let failure = parse_response_body(200, "\n  <!DOCTYPE html><html></html>").unwrap_err();
        assert!(matches!(failure, BodyFailure::Markup { status: 200, .. }));
    }

    #[test]
    fn empty_body_is_malformed() {
        let failure = parse_response_body(204, "").unwrap_err();
        assert!(matches!(failure, BodyFailure::Malformed { status: 204, .. }));
    }

    #[test]
    fn json_with_error_status_is_rejected() {
        let failure = parse_response_body(402, r#"{"error_message":"quota exceeded"}"#).unwrap_err();
        match failure {
            BodyFailure::Rejected { status, body } => {
                assert_eq!(status, 402);
                assert_eq!(error_message(&body).as_deref(), Some("quota exceeded"));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[test]
    fn error_message_priority_order() {
        let body = json!({"error": "first", "error_message": "second", "message": "third"});
        assert_eq!(error_message(&body).as_deref(), Some("first"));

        let body = json!({"error_message": "second", "message": "third"});
        assert_eq!(error_message(&body).as_deref(), Some("second"));

        let body = json!({"message": "third"});
        assert_eq!(error_message(&body).as_deref(), Some("third"));

        assert_eq!(error_message(&json!({"data": []})), None);
    }

    #[test]
    fn error_message_reads_nested_v6_envelope() {
        let body = json!({"error": {"class": "ClientDisabled", "message": "Client is disabled"}});
        assert_eq!(error_message(&body).as_deref(), Some("Client is disabled"));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo wörld", 4), "héll");
        assert_eq!(excerpt("ab", 10), "ab");
    }
}
