// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    routing::{get, post},
};
use genrelay_core::{GenerationBackend, RelayError};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Gateway server configuration (mirrors `ServerConfig` from genrelay-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Per-session relay tuning.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Capacity of each session's frame channel.
    pub channel_capacity: usize,
    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            keep_alive: Duration::from_secs(15),
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Generation backend every request is forwarded to.
    pub backend: Arc<dyn GenerationBackend>,
    /// Relay tuning applied to every streamed request.
    pub settings: Arc<RelaySettings>,
    /// Parent of every session's cancellation token.
    pub shutdown: CancellationToken,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl GatewayState {
    /// Creates state for `backend` with a fresh start time.
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        settings: RelaySettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            backend,
            settings: Arc::new(settings),
            shutdown,
            start_time: Instant::now(),
        }
    }
}

/// Builds the gateway router:
/// - GET /stream (SSE relay)
/// - POST /generate (single-shot)
/// - GET /health
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/stream", get(handlers::get_stream))
        .route("/generate", post(handlers::post_generate))
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured host:port.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, RelayError> {
    let addr = format!("{}:{}", config.host, config.port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Serves the gateway on `listener` until the state's shutdown token is cancelled.
///
/// Cancelling the token also cancels every live relay session, so open
/// streams end with their terminal frame and graceful shutdown can finish.
pub async fn serve(listener: TcpListener, state: GatewayState) -> Result<(), RelayError> {
    let shutdown = state.shutdown.clone();
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway server listening on {addr}");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| RelayError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}

/// Binds and serves in one step.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), RelayError> {
    let listener = bind(config).await?;
    serve(listener, state).await
}
