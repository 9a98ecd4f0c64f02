//! Wire types for the `/api/chat` endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::session::Mode;
use crate::{Error, Result};

/// Longest backend error text kept in a server error message
const MAX_ERROR_DETAIL: usize = 200;

/// Request body sent to the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub query: String,
    pub use_rag: bool,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>, mode: Mode) -> Self {
        Self {
            query: query.into(),
            use_rag: mode.uses_rag(),
        }
    }
}

/// Successful response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    /// What the backend actually did, which may differ from the request
    pub used_rag: bool,
    #[serde(default)]
    pub context: Option<Vec<JsonValue>>,
}

impl ChatResponse {
    /// Parse a success body
    ///
    /// Missing `reply` or `usedRag`, or a non-array `context`, is a malformed
    /// response. An explicit empty `reply` is accepted as a valid answer
    /// rather than rejected as malformed.
    pub fn from_body(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| {
            Error::MalformedResponse(format!("{} in body: {}", e, truncate(body)))
        })
    }
}

/// Error body some backends return alongside a failure status
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Extract a readable message from a failure body
///
/// Prefers `{"error": "..."}`, falls back to the raw text.
pub fn error_detail(body: &str) -> String {
    let detail = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_string(),
    };
    truncate(&detail)
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_DETAIL) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = ChatRequest::new("What is X?", Mode::Rag);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"query": "What is X?", "useRag": true}));
    }

    #[test]
    fn test_response_with_context() {
        let response = ChatResponse::from_body(
            r#"{"reply": "X is...", "usedRag": true, "context": [{"doc": "a"}]}"#,
        )
        .unwrap();
        assert_eq!(response.reply, "X is...");
        assert!(response.used_rag);
        assert_eq!(response.context, Some(vec![json!({"doc": "a"})]));
    }

    #[test]
    fn test_response_without_context() {
        let response = ChatResponse::from_body(r#"{"reply": "X is...", "usedRag": false}"#).unwrap();
        assert!(response.context.is_none());

        let response =
            ChatResponse::from_body(r#"{"reply": "", "usedRag": false, "context": null}"#).unwrap();
        assert_eq!(response.reply, "");
        assert!(response.context.is_none());
    }

    #[test]
    fn test_response_missing_fields_is_malformed() {
        for body in [
            r#"{"usedRag": false}"#,
            r#"{"reply": "x"}"#,
            r#"{"reply": null, "usedRag": false}"#,
            r#"{"reply": "x", "usedRag": true, "context": "doc"}"#,
            "<html>oops</html>",
        ] {
            let err = ChatResponse::from_body(body).unwrap_err();
            assert!(matches!(err, Error::MalformedResponse(_)), "body: {}", body);
        }
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(r#"{"error": "index not loaded"}"#), "index not loaded");
        assert_eq!(error_detail("Missing query\n"), "Missing query");

        let long = "e".repeat(500);
        let detail = error_detail(&long);
        assert!(detail.ends_with("..."));
        assert_eq!(detail.len(), MAX_ERROR_DETAIL + 3);
    }
}
