// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types used across adapter traits and the mnemo workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind a [`crate::traits::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    Storage,
}

// --- Conversation model ---

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse from SQLite string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// A conversation thread. The title is mutable; `updated_at` is bumped on
/// every appended turn so listings surface the most recently active first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    /// Model the conversation was started with.
    pub model: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-activity timestamp.
    pub updated_at: String,
}

/// A single utterance within a conversation. Immutable after creation
/// except for the soft-delete flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// Soft-deleted turns are excluded from every read path.
    pub deleted: bool,
}

/// A conversation row as returned by listings: metadata plus a turn count
/// and a preview of the opening turn.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub model: String,
    pub created_at: String,
    pub updated_at: String,
    pub turn_count: i64,
    pub first_turn: Option<String>,
}

/// Inclusive date range filter over RFC 3339 timestamps.
#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Filter for conversation listings.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub date_range: Option<DateRange>,
    /// Case-insensitive substring match against titles and turn content.
    pub keyword: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// --- Retrieval ---

/// Which search leg produced a retrieval result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalSource {
    Keyword,
    Semantic,
    /// Found by both the keyword and the semantic leg.
    Hybrid,
}

impl RetrievalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalSource::Keyword => "keyword",
            RetrievalSource::Semantic => "semantic",
            RetrievalSource::Hybrid => "hybrid",
        }
    }
}

/// A turn surfaced by hybrid retrieval, with its fused score.
///
/// Ephemeral: computed per query, never persisted.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub turn: Turn,
    /// Fused relevance score in [0, 1].
    pub score: f32,
    pub source: RetrievalSource,
}

impl RetrievalResult {
    /// The text injected into prompts for this result.
    pub fn snippet(&self) -> &str {
        &self.turn.content
    }
}

// --- Indexing bookkeeping ---

/// A turn persisted in the structured store but not yet embedded.
#[derive(Debug, Clone)]
pub struct PendingIndex {
    pub turn_id: String,
    pub conversation_id: String,
    pub attempts: i64,
    pub created_at: String,
}

/// A deleted conversation whose vector rows have not been confirmed removed.
#[derive(Debug, Clone)]
pub struct VectorTombstone {
    pub conversation_id: String,
    pub created_at: String,
}

/// A soft-deleted turn whose vector row has not been confirmed removed.
#[derive(Debug, Clone)]
pub struct TurnTombstone {
    pub turn_id: String,
    pub created_at: String,
}

// --- Inference types ---

/// A single message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// A request to an inference backend.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub stream: bool,
}

/// A full (non-streaming) completion response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

/// One chunk of a streaming completion.
#[derive(Debug, Clone)]
pub struct CompletionChunk {
    /// Incremental response text, if this chunk carries any.
    pub text: Option<String>,
    /// True on the final chunk of the stream.
    pub done: bool,
    /// Token accounting, reported on the final chunk.
    pub usage: Option<TokenUsage>,
}

/// Token accounting for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A model known to the inference backend.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    /// On-disk size in bytes, when reported.
    pub size: Option<u64>,
    pub modified_at: Option<String>,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrip() {
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Role::from_str_value("user"), Role::User);
        assert_eq!(Role::from_str_value("assistant"), Role::Assistant);
        // Unknown strings default to user rather than failing the read path.
        assert_eq!(Role::from_str_value("system"), Role::User);
    }

    #[test]
    fn role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(parsed, Role::User);
    }

    #[test]
    fn adapter_type_display_roundtrip() {
        use std::str::FromStr;
        for variant in [AdapterType::Provider, AdapterType::Embedding, AdapterType::Storage] {
            let s = variant.to_string();
            assert_eq!(AdapterType::from_str(&s).unwrap(), variant);
        }
    }

    #[test]
    fn retrieval_source_labels() {
        assert_eq!(RetrievalSource::Keyword.as_str(), "keyword");
        assert_eq!(RetrievalSource::Semantic.as_str(), "semantic");
        assert_eq!(RetrievalSource::Hybrid.as_str(), "hybrid");
    }

    #[test]
    fn retrieval_result_snippet_is_turn_content() {
        let result = RetrievalResult {
            turn: Turn {
                id: "t1".into(),
                conversation_id: "c1".into(),
                role: Role::User,
                content: "postgres tuning notes".into(),
                created_at: "2026-01-01T00:00:00.000Z".into(),
                deleted: false,
            },
            score: 0.8,
            source: RetrievalSource::Hybrid,
        };
        assert_eq!(result.snippet(), "postgres tuning notes");
    }
}
