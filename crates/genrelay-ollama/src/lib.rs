// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama backend adapter for the genrelay proxy.
//!
//! This crate implements [`GenerationBackend`] for the Ollama
//! `/api/generate` endpoint, providing both single-shot completion and
//! streaming NDJSON responses decoded into generation events.

pub mod client;
pub mod ndjson;
pub mod types;

use async_trait::async_trait;
use genrelay_config::model::UpstreamConfig;
use genrelay_core::{EventStream, GenerationBackend, HealthStatus, RelayError};
use tracing::{debug, info};

use crate::client::OllamaClient;

/// Ollama backend implementing [`GenerationBackend`].
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: OllamaClient,
}

impl OllamaBackend {
    /// Creates a backend from the upstream configuration section.
    pub fn new(config: &UpstreamConfig) -> Result<Self, RelayError> {
        let client = OllamaClient::new(config)?;
        info!(
            endpoint = config.endpoint,
            model = config.model,
            "Ollama backend initialized"
        );
        Ok(Self { client })
    }

    /// Returns the underlying HTTP client.
    pub fn client(&self) -> &OllamaClient {
        &self.client
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        self.client.model()
    }

    async fn complete(&self, prompt: &str) -> Result<String, RelayError> {
        debug!(prompt_len = prompt.len(), "single-shot generation");
        self.client.generate(prompt).await
    }

    async fn stream(&self, prompt: &str) -> Result<EventStream, RelayError> {
        debug!(prompt_len = prompt.len(), "streaming generation");
        self.client.stream_generate(prompt).await
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        match self.client.ping_origin().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> OllamaBackend {
        OllamaBackend::new(&UpstreamConfig {
            endpoint: format!("{}/api/generate", server.uri()),
            model: "test-model".into(),
            ..UpstreamConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn backend_identity() {
        let server = MockServer::start().await;
        let backend = backend_for(&server);
        assert_eq!(backend.name(), "ollama");
        assert_eq!(backend.model(), "test-model");
        assert_eq!(backend.client().endpoint(), format!("{}/api/generate", server.uri()));
    }

    #[tokio::test]
    async fn stream_through_trait_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "{\"response\":\"a\"}\n{\"error\":\"out of memory\"}\n",
                "application/x-ndjson",
            ))
            .mount(&server)
            .await;

        let backend: Box<dyn GenerationBackend> = Box::new(backend_for(&server));
        let items: Vec<_> = backend.stream("p").await.unwrap().collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().text, "a");
        assert!(items[1].as_ref().unwrap_err().to_string().contains("out of memory"));
    }

    #[tokio::test]
    async fn health_check_unhealthy_when_origin_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let status = backend_for(&server).health_check().await.unwrap();
        assert!(matches!(status, HealthStatus::Unhealthy(_)), "got: {status:?}");
    }

    #[tokio::test]
    async fn health_check_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let status = backend_for(&server).health_check().await.unwrap();
        assert_eq!(status, HealthStatus::Healthy);
    }
}
