// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the genrelay proxy.
//!
//! The gateway accepts client requests, validates them, and forwards them to
//! a [`GenerationBackend`](genrelay_core::GenerationBackend). Streamed
//! requests run through a [`RelaySession`]: a spawned producer pushes
//! [`RelayFrame`](genrelay_core::RelayFrame)s into a bounded channel and the
//! SSE response drains it in order, ending with `data: [DONE]`.

pub mod handlers;
pub mod relay;
pub mod server;

pub use relay::RelaySession;
pub use server::{GatewayState, RelaySettings, ServerConfig, bind, router, serve, start_server};
