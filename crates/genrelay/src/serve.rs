// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `genrelay serve` command implementation.
//!
//! Builds the Ollama backend from the `[upstream]` section, binds the
//! gateway on the `[server]` address and serves until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use genrelay_config::GenrelayConfig;
use genrelay_core::{GenerationBackend, HealthStatus, RelayError};
use genrelay_gateway::{GatewayState, RelaySettings, ServerConfig};
use genrelay_ollama::OllamaBackend;
use tracing::{error, info, warn};

use crate::shutdown;

/// Runs the `genrelay serve` command.
pub async fn run_serve(config: GenrelayConfig) -> Result<(), RelayError> {
    init_tracing(&config.log.level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting genrelay serve");

    let backend = Arc::new(OllamaBackend::new(&config.upstream)?);
    report_backend_health(backend.as_ref()).await;

    let cancel = shutdown::install_signal_handler();
    let state = GatewayState::new(backend, relay_settings(&config), cancel);

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    if let Err(e) = genrelay_gateway::start_server(&server_config, state).await {
        error!(error = %e, "gateway server failed");
        return Err(e);
    }

    info!("genrelay serve shutdown complete");
    Ok(())
}

/// Derives relay tuning from the `[server]` section.
fn relay_settings(config: &GenrelayConfig) -> RelaySettings {
    RelaySettings {
        channel_capacity: config.server.channel_capacity,
        keep_alive: Duration::from_secs(config.server.keep_alive_secs),
    }
}

/// Logs whether the backend answers; an unreachable backend is not fatal.
async fn report_backend_health(backend: &dyn GenerationBackend) {
    match backend.health_check().await {
        Ok(HealthStatus::Healthy) => info!(backend = backend.name(), "backend reachable"),
        Ok(HealthStatus::Degraded(reason)) | Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(backend = backend.name(), %reason, "backend not reachable yet, serving anyway");
        }
        Err(e) => warn!(backend = backend.name(), error = %e, "backend health check failed"),
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("genrelay={log_level},warn")));

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
