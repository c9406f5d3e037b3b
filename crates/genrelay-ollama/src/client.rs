// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Ollama generate API.
//!
//! Provides [`OllamaClient`] which handles request construction, status
//! checking, error-body decoding and the streaming NDJSON body.

use std::time::Duration;

use futures::StreamExt;
use genrelay_config::model::UpstreamConfig;
use genrelay_core::{EventStream, RelayError};
use reqwest::Url;
use tracing::debug;

use crate::ndjson;
use crate::types::{ErrorBody, GenerateChunk, GenerateRequest};

/// Returned by [`OllamaClient::generate`] when the backend answers with no text.
pub const NO_RESPONSE: &str = "No response from model.";

/// HTTP client for one configured generate endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Creates a client from the upstream configuration section.
    pub fn new(config: &UpstreamConfig) -> Result<Self, RelayError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            timeout,
        })
    }

    /// Returns the model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the generate endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Starts a streaming generation and returns its decoded events.
    ///
    /// Fails before returning a stream when the backend is unreachable or
    /// answers with a non-2xx status. Failures after that arrive as the
    /// stream's last item.
    pub async fn stream_generate(&self, prompt: &str) -> Result<EventStream, RelayError> {
        let response = self.post(prompt, true).await?;
        let timeout = self.timeout;
        let endpoint = self.endpoint.clone();
        let bytes = Box::pin(
            response
                .bytes_stream()
                .map(move |chunk| chunk.map_err(|e| transport_error(e, &endpoint, timeout))),
        );
        Ok(ndjson::decode_stream(bytes))
    }

    /// Runs a single-shot generation and returns the complete text.
    ///
    /// A missing or empty `response` field yields [`NO_RESPONSE`].
    pub async fn generate(&self, prompt: &str) -> Result<String, RelayError> {
        let response = self.post(prompt, false).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, &self.endpoint, self.timeout))?;
        let chunk: GenerateChunk = serde_json::from_slice(&body).map_err(|e| RelayError::Upstream {
            message: format!("failed to parse backend response: {e}"),
            source: Some(Box::new(e)),
        })?;
        if let Some(message) = chunk.error {
            return Err(RelayError::upstream(message));
        }
        match chunk.response {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Ok(NO_RESPONSE.to_string()),
        }
    }

    /// Issues a GET against the endpoint's origin and reports whether it answered 2xx.
    pub async fn ping_origin(&self) -> Result<(), RelayError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| RelayError::Config(format!("invalid endpoint `{}`: {e}", self.endpoint)))?;
        url.set_path("/");
        url.set_query(None);

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(5).min(self.timeout))
            .send()
            .await
            .map_err(|e| transport_error(e, &self.endpoint, self.timeout))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RelayError::upstream(format!("backend origin returned {status}")))
        }
    }

    async fn post(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, RelayError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, &self.endpoint, self.timeout))?;

        let status = response.status();
        debug!(status = %status, stream, "generate response received");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => format!("Ollama error ({status}): {}", err.error),
            Err(_) => format!("backend returned {status}: {body}"),
        };
        Err(RelayError::upstream(message))
    }
}

fn transport_error(e: reqwest::Error, endpoint: &str, timeout: Duration) -> RelayError {
    if e.is_timeout() {
        RelayError::Timeout { duration: timeout }
    } else {
        RelayError::Upstream {
            message: format!("could not reach backend at {endpoint}: {e}"),
            source: Some(Box::new(e)),
        }
    }
}
