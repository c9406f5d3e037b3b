// SPDX-FileCopyrightText: 2026 Genrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! miette diagnostics for `genrelay.toml` problems.
//!
//! The config model is flat: three sections (`[server]`, `[upstream]`,
//! `[log]`) of scalar keys. A figment failure is therefore either an unknown
//! section, an unknown key inside a section, or a value of the wrong type.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key needs before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, renderable with miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A section or key that the model does not define.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(genrelay::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// The unrecognized name.
        key: String,
        /// Closest known name, if any is similar enough.
        suggestion: Option<String>,
        /// Comma-separated names accepted at that level.
        valid_keys: String,
        #[label("not a genrelay setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that does not deserialize into the field's type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(genrelay::config::invalid_type))]
    InvalidType {
        /// Dotted `section.key` path.
        key: String,
        detail: String,
    },

    /// A value that parsed but is out of range or malformed.
    #[error("validation error: {message}")]
    #[diagnostic(code(genrelay::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(genrelay::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let mut help = String::new();
    if let Some(s) = suggestion {
        help.push_str(&format!("did you mean `{s}`? "));
    }
    help.push_str(&format!("Valid keys: {valid_keys}"));
    help
}

/// Turns every error inside a figment failure into a [`ConfigError`].
///
/// `sources` pairs a display name with the TOML text it was loaded from and
/// is used to point the unknown-key label at the offending line.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(key, expected) => {
                let (span, src) = source_for(&error, sources)
                    .and_then(|(name, content)| {
                        let section = error.path.first().map(String::as_str);
                        let offset = locate_key(content, section, key)?;
                        Some((
                            SourceSpan::new(offset.into(), key.len()),
                            NamedSource::new(name, content.to_string()),
                        ))
                    })
                    .unzip();
                ConfigError::UnknownKey {
                    key: key.clone(),
                    suggestion: suggest_key(key, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Picks the TOML text an error came from.
///
/// Inline strings carry no file path in figment metadata, so a lone source
/// is assumed to be the culprit.
fn source_for<'a>(
    error: &figment::error::Error,
    sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let file = error.metadata.as_ref().and_then(|m| match m.source.as_ref()? {
        figment::Source::File(path) => Some(path.display().to_string()),
        _ => None,
    });
    let (name, content) = match file {
        Some(file) => sources.iter().find(|(name, _)| *name == file)?,
        None if sources.len() == 1 => &sources[0],
        None => return None,
    };
    Some((name.as_str(), content.as_str()))
}

/// Byte offset of `key` in TOML `content`.
///
/// With `section = None` the key is an unknown table and its `[key]` header
/// is located. Otherwise the key must appear as `key =` inside `[section]`.
pub fn locate_key(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            let header = header.trim();
            if section.is_none() && header == key {
                return Some(offset + line.find(key).unwrap_or(indent));
            }
            current = Some(header);
        } else if section.is_some() && current == section {
            let is_key = trimmed
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if is_key {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }
    None
}

/// The known key most similar to `unknown`, if it clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|&(_, score)| score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Writes each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
