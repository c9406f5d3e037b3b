// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for genrelay integration tests.
//!
//! Provides a scripted [`MockBackend`] so the relay and the HTTP surface can
//! be exercised deterministically without a running model server.

pub mod mock_backend;

pub use mock_backend::{MockBackend, Script};
