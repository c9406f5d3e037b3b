// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the genrelay streaming proxy.
//!
//! This crate provides the error type, the frame and event types that flow
//! between the upstream client and the relay, and the [`GenerationBackend`]
//! trait the gateway is written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RelayError;
pub use traits::{EventStream, GenerationBackend};
pub use types::{GenerationEvent, HealthStatus, RelayFrame, RelayState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_error_display() {
        let err = RelayError::upstream("connection refused");
        assert_eq!(err.to_string(), "upstream error: connection refused");
        assert!(err.is_upstream());

        let timeout = RelayError::Timeout {
            duration: std::time::Duration::from_secs(300),
        };
        assert!(timeout.is_upstream());
        assert!(timeout.to_string().contains("300s"));

        let invalid = RelayError::InvalidRequest("No prompt provided.".into());
        assert!(!invalid.is_upstream());
    }

    #[test]
    fn relay_state_displays_lowercase() {
        assert_eq!(RelayState::Open.to_string(), "open");
        assert_eq!(RelayState::Done.to_string(), "done");
    }

    #[test]
    fn generation_event_constructors() {
        assert_eq!(
            GenerationEvent::fragment("Hel"),
            GenerationEvent {
                text: "Hel".into(),
                is_final: false
            }
        );
        assert!(GenerationEvent::last("").is_final);
    }

    #[tokio::test]
    async fn default_health_check_is_healthy() {
        use async_trait::async_trait;

        struct Fixed;

        #[async_trait]
        impl GenerationBackend for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn model(&self) -> &str {
                "none"
            }
            async fn complete(&self, prompt: &str) -> Result<String, RelayError> {
                Ok(prompt.to_string())
            }
            async fn stream(&self, _prompt: &str) -> Result<EventStream, RelayError> {
                Ok(Box::pin(futures::stream::empty()))
            }
        }

        assert_eq!(Fixed.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
