// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the seam between the gateway and generation backends.

pub mod backend;

pub use backend::{EventStream, GenerationBackend};
