// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./genrelay.toml` > `~/.config/genrelay/genrelay.toml` > `/etc/genrelay/genrelay.toml`
//! with environment variable overrides via `GENRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::GenrelayConfig;

/// Top-level sections an environment variable can address.
const ENV_SECTIONS: &[&str] = &["server", "upstream", "log"];

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/genrelay/genrelay.toml";

/// Local configuration file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "genrelay.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/genrelay/genrelay.toml` (system-wide)
/// 3. `~/.config/genrelay/genrelay.toml` (user XDG config)
/// 4. `./genrelay.toml` (local directory)
/// 5. `GENRELAY_*` environment variables
pub fn load_config() -> Result<GenrelayConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<GenrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GenrelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<GenrelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GenrelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Path of the per-user configuration file, if the platform has a config dir.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("genrelay/genrelay.toml"))
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(GenrelayConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Only the section prefix is turned into a dot, so
/// `GENRELAY_UPSTREAM_TIMEOUT_SECS` maps to `upstream.timeout_secs`,
/// not `upstream.timeout.secs`.
fn env_provider() -> Env {
    Env::prefixed("GENRELAY_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config key.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
