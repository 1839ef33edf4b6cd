// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading through Figment.
//!
//! Compiled defaults, then `/etc/mnemo/mnemo.toml`, the XDG user config,
//! and `./mnemo.toml`, with `MNEMO_*` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MnemoConfig;

/// Config sections, used to map `MNEMO_SECTION_KEY` env vars onto
/// `section.key` paths.
const SECTIONS: [&str; 5] = ["agent", "storage", "ollama", "retrieval", "indexing"];

/// TOML files consulted on load, lowest precedence first.
pub(crate) fn candidate_files() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from("/etc/mnemo/mnemo.toml")];
    if let Some(dir) = dirs::config_dir() {
        files.push(dir.join("mnemo/mnemo.toml"));
    }
    files.push(PathBuf::from("mnemo.toml"));
    files
}

/// Load configuration from the standard file hierarchy with env overrides.
pub fn load_config() -> Result<MnemoConfig, figment::Error> {
    let base = Figment::from(Serialized::defaults(MnemoConfig::default()));
    candidate_files()
        .into_iter()
        .fold(base, |figment, file| figment.merge(Toml::file(file)))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only. No file lookup, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<MnemoConfig, figment::Error> {
    Figment::from(Serialized::defaults(MnemoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, still honoring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<MnemoConfig, figment::Error> {
    Figment::from(Serialized::defaults(MnemoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `MNEMO_OLLAMA_EMBEDDING_MODEL` to
/// `ollama.embedding_model`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that themselves contain underscores survive. `Env::split("_")`
/// would mangle them.
fn env_provider() -> Env {
    Env::prefixed("MNEMO_").map(|key| {
        // Keys arrive case-preserved with the prefix stripped:
        // MNEMO_OLLAMA_BASE_URL comes through as "OLLAMA_BASE_URL".
        let lowered = key.as_str().to_ascii_lowercase();
        for section in SECTIONS {
            if let Some(rest) = lowered.strip_prefix(section)
                && let Some(rest) = rest.strip_prefix('_')
            {
                return format!("{section}.{rest}").into();
            }
        }
        lowered.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn load_from_str_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[ollama]
model = "qwen3"
"#,
        )
        .unwrap();
        assert_eq!(config.ollama.model, "qwen3");
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
    }

    #[test]
    #[serial]
    fn env_var_overrides_underscore_keys() {
        // SAFETY: serialized test, no other thread reads the environment here.
        unsafe { std::env::set_var("MNEMO_OLLAMA_EMBEDDING_MODEL", "mxbai-embed-large") };
        let config = load_config().unwrap();
        unsafe { std::env::remove_var("MNEMO_OLLAMA_EMBEDDING_MODEL") };
        assert_eq!(config.ollama.embedding_model, "mxbai-embed-large");
    }

    #[test]
    #[serial]
    fn env_var_overrides_nested_section() {
        unsafe { std::env::set_var("MNEMO_RETRIEVAL_MAX_RESULTS", "9") };
        let config = load_config().unwrap();
        unsafe { std::env::remove_var("MNEMO_RETRIEVAL_MAX_RESULTS") };
        assert_eq!(config.retrieval.max_results, 9);
    }
}
