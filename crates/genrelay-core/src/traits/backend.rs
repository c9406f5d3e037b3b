// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend trait for text-generation services (Ollama and test doubles).

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::RelayError;
use crate::types::{GenerationEvent, HealthStatus};

/// Boxed stream of decoded generation events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<GenerationEvent, RelayError>> + Send>>;

/// A text-generation backend the gateway can forward prompts to.
///
/// Implementations handle both the single-shot request and the incremental
/// stream. Dropping the returned stream must abort the underlying call.
#[async_trait]
pub trait GenerationBackend: Send + Sync + 'static {
    /// Returns the human-readable name of this backend.
    fn name(&self) -> &str;

    /// Returns the model identifier requests are sent with.
    fn model(&self) -> &str;

    /// Sends the prompt and waits for the complete reply text.
    async fn complete(&self, prompt: &str) -> Result<String, RelayError>;

    /// Opens a streaming generation call.
    ///
    /// Errors that happen before the first byte are returned directly;
    /// errors that happen afterwards arrive as an `Err` item, after which
    /// the stream ends.
    async fn stream(&self, prompt: &str) -> Result<EventStream, RelayError>;

    /// Performs a health check and returns the backend's current status.
    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }
}
