// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, absolute upstream URLs and positive timeouts.

use url::Url;

use crate::diagnostic::ConfigError;
use crate::model::GenrelayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &GenrelayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.server.channel_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "server.channel_capacity must be at least 1".to_string(),
        });
    }

    if config.server.keep_alive_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "server.keep_alive_secs must be at least 1".to_string(),
        });
    }

    let endpoint = config.upstream.endpoint.trim();
    match Url::parse(endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
        Ok(_) => errors.push(ConfigError::Validation {
            message: format!("upstream.endpoint `{endpoint}` must be an http:// or https:// URL"),
        }),
        Err(e) => errors.push(ConfigError::Validation {
            message: format!("upstream.endpoint `{endpoint}` is not a valid URL: {e}"),
        }),
    }

    if config.upstream.model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "upstream.model must not be empty".to_string(),
        });
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "upstream.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "upstream.connect_timeout_secs must be at least 1".to_string(),
        });
    } else if config.upstream.connect_timeout_secs > config.upstream.timeout_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "upstream.connect_timeout_secs ({}) must not exceed upstream.timeout_secs ({})",
                config.upstream.connect_timeout_secs, config.upstream.timeout_secs
            ),
        });
    }

    let level = config.log.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of: {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
