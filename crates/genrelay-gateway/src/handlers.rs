// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Handles GET /stream, POST /generate and GET /health.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{KeepAlive, Sse},
    },
};
use genrelay_core::{HealthStatus, RelayError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::relay::RelaySession;
use crate::server::GatewayState;

/// Message returned when a request carries no usable prompt.
pub const NO_PROMPT: &str = "No prompt provided.";

/// Query string of GET /stream.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Prompt text, forwarded verbatim.
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Request body for POST /generate.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Prompt text, forwarded verbatim.
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Response body for POST /generate.
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// Complete generated text.
    pub response: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    /// Seconds since the gateway started.
    pub uptime_secs: u64,
    /// Backend name.
    pub backend: String,
    /// Model requests are forwarded with.
    pub model: String,
    /// Result of the backend health check.
    pub upstream: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Maps a backend failure to the status returned by POST /generate.
pub fn status_for(err: &RelayError) -> StatusCode {
    match err {
        RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RelayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        RelayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Returns the prompt if it has any non-whitespace content.
fn usable_prompt(prompt: Option<String>) -> Option<String> {
    prompt.filter(|p| !p.trim().is_empty())
}

/// GET /stream
///
/// Relays the backend's incremental output as Server-Sent Events. The
/// response ends with `data: [DONE]` on every path that reaches the backend.
pub async fn get_stream(State(state): State<GatewayState>, Query(query): Query<StreamQuery>) -> Response {
    let Some(prompt) = usable_prompt(query.prompt) else {
        debug!("rejecting stream request without prompt");
        return error_response(StatusCode::BAD_REQUEST, NO_PROMPT);
    };

    let session = RelaySession::start(
        state.backend.clone(),
        prompt,
        state.settings.channel_capacity,
        &state.shutdown,
    );
    info!(session_id = session.id(), "stream relay started");

    let sse = Sse::new(session.into_events())
        .keep_alive(KeepAlive::new().interval(state.settings.keep_alive));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        sse,
    )
        .into_response()
}

/// POST /generate
///
/// Forwards the prompt as a single-shot generation and returns the full text.
pub async fn post_generate(
    State(state): State<GatewayState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            debug!(error = %rejection, "rejecting malformed generate body");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", rejection.body_text()),
            );
        }
    };

    let Some(prompt) = usable_prompt(body.prompt) else {
        return error_response(StatusCode::BAD_REQUEST, NO_PROMPT);
    };

    match state.backend.complete(&prompt).await {
        Ok(response) => (StatusCode::OK, Json(GenerateResponse { response })).into_response(),
        Err(e) => {
            warn!(error = %e, "single-shot generation failed");
            error_response(status_for(&e), e.to_string())
        }
    }
}

/// GET /health
///
/// Liveness of the gateway itself; the backend health result is informational.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let upstream = match state.backend.health_check().await {
        Ok(HealthStatus::Healthy) => "healthy".to_string(),
        Ok(HealthStatus::Degraded(reason)) => format!("degraded: {reason}"),
        Ok(HealthStatus::Unhealthy(reason)) => format!("unhealthy: {reason}"),
        Err(e) => format!("unhealthy: {e}"),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        backend: state.backend.name().to_string(),
        model: state.backend.model().to_string(),
        upstream,
    })
}
