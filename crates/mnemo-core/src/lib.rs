// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the mnemo local chat assistant.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the mnemo workspace. Backends (inference,
//! embedding, storage) implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MnemoError;
pub use types::{AdapterType, HealthStatus, Role};

// Re-export adapter traits at crate root.
pub use traits::{EmbeddingAdapter, InferenceAdapter, PluginAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_has_all_variants() {
        let _config = MnemoError::Config("test".into());
        let _storage = MnemoError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _not_found = MnemoError::NotFound {
            kind: "conversation",
            id: "c1".into(),
        };
        let _dim = MnemoError::DimensionMismatch {
            expected: 768,
            actual: 384,
        };
        let _embedding = MnemoError::Embedding {
            message: "test".into(),
            source: None,
        };
        let _inference = MnemoError::Inference {
            message: "test".into(),
            source: None,
        };
        let _timeout = MnemoError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = MnemoError::Internal("test".into());
    }

    #[test]
    fn transient_classification() {
        assert!(MnemoError::Embedding {
            message: "connection refused".into(),
            source: None,
        }
        .is_transient());
        assert!(!MnemoError::NotFound {
            kind: "turn",
            id: "t1".into(),
        }
        .is_transient());
        assert!(!MnemoError::Inference {
            message: "model missing".into(),
            source: None,
        }
        .is_transient());
    }

    #[test]
    fn dimension_mismatch_message_names_both_sizes() {
        let err = MnemoError::DimensionMismatch {
            expected: 768,
            actual: 384,
        };
        let msg = err.to_string();
        assert!(msg.contains("768"), "got: {msg}");
        assert!(msg.contains("384"), "got: {msg}");
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_inference_adapter<T: InferenceAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
    }
}
