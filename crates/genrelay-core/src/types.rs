// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types passed between the upstream client and the relay.

use strum::Display;

/// Health status reported by backend health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

/// One decoded unit of upstream generation output.
///
/// Produced by the reassembler for every upstream line carrying text or the
/// final marker. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationEvent {
    /// Text fragment; may be empty on the final event.
    pub text: String,
    /// Set on the last event of a generation.
    pub is_final: bool,
}

impl GenerationEvent {
    /// A non-final event carrying `text`.
    pub fn fragment(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    /// The final event, optionally carrying a last piece of text.
    pub fn last(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// A unit flowing from the producer task to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// A piece of generated text.
    Fragment(String),
    /// The upstream call failed; no more fragments follow.
    Error(String),
    /// The upstream generation finished.
    Done,
}

/// Lifecycle state of a relayed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RelayState {
    /// Frames may still arrive.
    Open,
    /// The terminal sentinel has been emitted.
    Done,
}
