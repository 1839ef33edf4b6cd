// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for mnemo.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level mnemo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemoConfig {
    /// Agent identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ollama backend settings (inference and embeddings).
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Hybrid retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Embedding indexing pipeline settings.
    #[serde(default)]
    pub indexing: IndexingConfig,
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system prompt string.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Number of recent turns from the active conversation included verbatim
    /// in every prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
            history_window: default_history_window(),
        }
    }
}

fn default_agent_name() -> String {
    "mnemo".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_history_window() -> usize {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the structured SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Path to the vector index SQLite database file.
    #[serde(default = "default_vector_path")]
    pub vector_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            vector_path: default_vector_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("mnemo").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .to_string_lossy()
        .into_owned()
}

fn default_database_path() -> String {
    data_file("mnemo.db")
}

fn default_vector_path() -> String {
    data_file("vectors.db")
}

fn default_wal_mode() -> bool {
    true
}

/// Ollama backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    /// Base URL of the Ollama HTTP API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default chat model.
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Dimensionality of the embedding model's output vectors.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Sampling temperature for chat completions.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dimensions() -> usize {
    768
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    300
}

/// Hybrid retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Weight of the keyword match-density score in fusion.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Weight of the cosine similarity score in fusion.
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Maximum number of retrieval results injected into a prompt.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Whitespace-token budget for injected retrieval snippets.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Candidates fetched per search leg before fusion.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Minimum cosine similarity for a semantic candidate.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Most recent turns of the active conversation excluded from retrieval
    /// (they are already in the dialogue window).
    #[serde(default = "default_exclude_recent_turns")]
    pub exclude_recent_turns: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            keyword_weight: default_keyword_weight(),
            semantic_weight: default_semantic_weight(),
            max_results: default_max_results(),
            max_context_tokens: default_max_context_tokens(),
            candidate_limit: default_candidate_limit(),
            similarity_threshold: default_similarity_threshold(),
            exclude_recent_turns: default_exclude_recent_turns(),
        }
    }
}

fn default_keyword_weight() -> f32 {
    0.4
}

fn default_semantic_weight() -> f32 {
    0.6
}

fn default_max_results() -> usize {
    5
}

fn default_max_context_tokens() -> usize {
    1024
}

fn default_candidate_limit() -> usize {
    50
}

fn default_similarity_threshold() -> f32 {
    0.25
}

fn default_exclude_recent_turns() -> usize {
    4
}

/// Embedding indexing pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexingConfig {
    /// Embedding attempts per turn before it is parked in the pending queue.
    #[serde(default = "default_max_embed_attempts")]
    pub max_embed_attempts: u32,

    /// Base backoff between embedding attempts, in milliseconds. Doubles
    /// per attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Pending rows processed per reconcile pass.
    #[serde(default = "default_reconcile_batch")]
    pub reconcile_batch: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_embed_attempts: default_max_embed_attempts(),
            backoff_ms: default_backoff_ms(),
            reconcile_batch: default_reconcile_batch(),
        }
    }
}

fn default_max_embed_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    250
}

fn default_reconcile_batch() -> usize {
    32
}
