// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths, weight ranges, and URL shape.

use crate::diagnostic::ConfigError;
use crate::model::MnemoConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MnemoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.vector_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.vector_path must not be empty".to_string(),
        });
    }

    if config.storage.database_path == config.storage.vector_path
        && !config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "storage.database_path and storage.vector_path must differ".to_string(),
        });
    }

    let base_url = config.ollama.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("ollama.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if config.ollama.embedding_dimensions == 0 {
        errors.push(ConfigError::Validation {
            message: "ollama.embedding_dimensions must be at least 1".to_string(),
        });
    }

    let kw = config.retrieval.keyword_weight;
    let sw = config.retrieval.semantic_weight;
    if kw < 0.0 || sw < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "retrieval weights must be non-negative, got keyword={kw}, semantic={sw}"
            ),
        });
    }
    if kw + sw <= 0.0 {
        errors.push(ConfigError::Validation {
            message: "retrieval.keyword_weight + retrieval.semantic_weight must be positive"
                .to_string(),
        });
    }

    if !(0.0..=1.0).contains(&config.retrieval.similarity_threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "retrieval.similarity_threshold must be in [0, 1], got {}",
                config.retrieval.similarity_threshold
            ),
        });
    }

    if config.retrieval.max_results == 0 {
        errors.push(ConfigError::Validation {
            message: "retrieval.max_results must be at least 1".to_string(),
        });
    }

    if config.indexing.max_embed_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "indexing.max_embed_attempts must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
