// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector record type and the similarity math used for search.

use serde::{Deserialize, Serialize};

/// One embedded turn in the vector store.
///
/// The vector store never holds turn content; the structured store is the
/// source of truth and results are hydrated from it by turn ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Turn ID this vector was derived from.
    pub turn_id: String,
    /// Parent conversation, for scoped queries and cascade deletes.
    pub conversation_id: String,
    /// Role of the source turn ("user" or "assistant").
    pub role: String,
    /// ISO 8601 creation timestamp of the source turn.
    pub created_at: String,
    /// The embedding vector.
    #[serde(skip)]
    pub vector: Vec<f32>,
}

/// A scored hit from a vector query.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub turn_id: String,
    pub conversation_id: String,
    pub score: f32,
}

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert SQLite BLOB back to f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// Full cosine similarity between two vectors.
///
/// Ollama embedding models do not emit L2-normalized vectors, so the dot
/// product alone is not enough. Returns 0.0 when either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
