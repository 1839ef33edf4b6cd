// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store for mnemo: embeddings as SQLite BLOBs, brute-force cosine
//! search, conversation-scoped deletes.

pub mod index;
pub mod types;

pub use index::VectorIndex;
pub use types::{blob_to_vec, cosine_similarity, vec_to_blob, EmbeddingRecord, VectorHit};
