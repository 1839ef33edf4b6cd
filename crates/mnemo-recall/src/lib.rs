// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexing pipeline and hybrid retrieval for mnemo.
//!
//! `IndexingPipeline` writes turns to both stores and repairs divergence;
//! `FusionRetriever` merges keyword and semantic search by weighted sum.

pub mod fusion;
pub mod indexer;

pub use fusion::FusionRetriever;
pub use indexer::{now_timestamp, IndexingPipeline, ReconcileReport};
