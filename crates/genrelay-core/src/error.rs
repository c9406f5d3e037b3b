// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the genrelay proxy.

use thiserror::Error;

/// The primary error type shared by the backend trait, the upstream client
/// and the gateway.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (invalid URL, header values, client construction).
    #[error("configuration error: {0}")]
    Config(String),

    /// The inbound client request was rejected before any upstream call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The generation backend could not be reached, answered with a non-2xx
    /// status, or reported an error inside its stream.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The upstream call exceeded its overall deadline.
    #[error("upstream timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// HTTP server errors (bind failure, serve loop failure).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Shorthand for an [`RelayError::Upstream`] without a source error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error originated on the backend side of the proxy.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Timeout { .. })
    }
}
