// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rich rendering of configuration failures.
//!
//! Figment reports deserialization problems as a flat error chain. This
//! module turns that chain into miette diagnostics: unknown keys get a
//! source span pointing at the offending line of the TOML file plus a
//! closest-match suggestion, type errors get the dotted key path.

#![allow(unused_assignments)] // triggered by code the miette derive expands to

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score below which a candidate key is not worth suggesting.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, rendered through miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no config section declares. Usually a typo.
    #[error("unrecognized configuration key `{section}{key}`")]
    #[diagnostic(
        code(mnemo::config::unknown_key),
        help("{}", unknown_key_help(suggestion, valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted section prefix including the trailing dot, or empty for
        /// top-level keys.
        section: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a known key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key whose value could not be deserialized.
    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(mnemo::config::invalid_value))]
    InvalidValue {
        key: String,
        detail: String,
        #[label("this value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that deserialized fine but fails a semantic constraint.
    #[error("validation error: {message}")]
    #[diagnostic(code(mnemo::config::validation))]
    Validation { message: String },

    /// Anything figment reports that has no richer mapping.
    #[error("configuration error: {0}")]
    #[diagnostic(code(mnemo::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: &Option<String>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`?"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Explode a `figment::Error` into one `ConfigError` per problem.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let section_path = error.path.join(".");
                let section = if section_path.is_empty() {
                    String::new()
                } else {
                    format!("{section_path}.")
                };
                let (span, src) = locate(toml_sources, &section_path, field);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    section,
                    suggestion: closest_key(field, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::InvalidType(actual, expected) => {
                let (section_path, field) = split_path(&error.path);
                let (span, src) = locate(toml_sources, &section_path, &field);
                ConfigError::InvalidValue {
                    key: error.path.join("."),
                    detail: format!("expected {expected}, found {actual}"),
                    span,
                    src,
                }
            }
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// Split a figment error path into its section prefix and final key.
fn split_path(path: &[String]) -> (String, String) {
    match path.split_last() {
        Some((key, section)) => (section.join("."), key.clone()),
        None => (String::new(), String::new()),
    }
}

/// Search the loaded TOML sources for `key` inside `section`, first hit wins.
fn locate(
    sources: &[(String, String)],
    section: &str,
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    if key.is_empty() {
        return (None, None);
    }
    for (path, content) in sources {
        if let Some(span) = locate_key(content, section, key) {
            return (Some(span), Some(NamedSource::new(path, content.clone())));
        }
    }
    (None, None)
}

/// Byte span of `key` within the `[section]` table of a TOML document.
///
/// Walks the document line by line, tracking which table the line belongs
/// to, so a key name that also appears in another section is not matched
/// by mistake. Returns `None` when the section or key is absent.
pub fn locate_key(content: &str, section: &str, key: &str) -> Option<SourceSpan> {
    let mut offset = 0usize;
    let mut current = "";
    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('[') {
            current = rest.split(']').next().unwrap_or("").trim();
        } else if current == section
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            let indent = line.len() - trimmed.len();
            return Some(SourceSpan::new((offset + indent).into(), key.len()));
        }
        offset += line.len() + 1;
    }
    None
}

/// The declared key most similar to `unknown`, if any is close enough.
pub fn closest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print every error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprint!("{}", render_one(error));
    }
}

fn render_one(error: &ConfigError) -> String {
    let handler = miette::GraphicalReportHandler::new();
    let mut buf = String::new();
    if handler.render_report(&mut buf, error).is_err() {
        buf = format!("Error: {error}\n");
    }
    buf
}
