// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response bodies of the Ollama `/api/generate` endpoint.

use serde::{Deserialize, Serialize};

/// Body of a generate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g., "deepseek-r1:latest").
    pub model: String,
    /// Prompt text, forwarded verbatim.
    pub prompt: String,
    /// `true` for newline-delimited incremental output.
    pub stream: bool,
}

/// One line of a streaming reply, or the whole body of a single-shot reply.
///
/// Every field is optional: unknown fields are ignored and missing ones
/// default, so only syntactically broken lines or wrongly typed fields fail
/// to decode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    /// Text generated since the previous chunk.
    #[serde(default)]
    pub response: Option<String>,
    /// Set on the last chunk of a generation.
    #[serde(default)]
    pub done: Option<bool>,
    /// Backend-reported failure, sent instead of text.
    #[serde(default)]
    pub error: Option<String>,
}

/// Error body returned alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_expected_shape() {
        let req = GenerateRequest {
            model: "deepseek-r1:latest".into(),
            prompt: "hi".into(),
            stream: true,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"model": "deepseek-r1:latest", "prompt": "hi", "stream": true})
        );
    }

    #[test]
    fn chunk_ignores_unknown_fields() {
        let chunk: GenerateChunk = serde_json::from_str(
            r#"{"model":"m","created_at":"2024-01-01T00:00:00Z","response":"Hel","done":false,"context":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(chunk.response.as_deref(), Some("Hel"));
        assert_eq!(chunk.done, Some(false));
        assert!(chunk.error.is_none());
    }

    #[test]
    fn chunk_tolerates_missing_fields() {
        let chunk: GenerateChunk = serde_json::from_str("{}").unwrap();
        assert!(chunk.response.is_none());
        assert!(chunk.done.is_none());
    }

    #[test]
    fn chunk_rejects_wrong_types() {
        assert!(serde_json::from_str::<GenerateChunk>(r#"{"response": 5}"#).is_err());
    }
}
