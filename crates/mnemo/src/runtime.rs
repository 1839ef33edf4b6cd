// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared construction of the stores, pipeline, and retriever.

use std::sync::Arc;

use colored::Colorize;
use mnemo_config::MnemoConfig;
use mnemo_core::traits::{EmbeddingAdapter, InferenceAdapter};
use mnemo_core::MnemoError;
use mnemo_ollama::{OllamaEmbedder, OllamaProvider};
use mnemo_recall::{FusionRetriever, IndexingPipeline};
use mnemo_storage::Database;
use mnemo_vector::VectorIndex;
use tracing::info;

/// Everything a command needs to talk to the stores and the backend.
pub struct Runtime {
    pub db: Arc<Database>,
    pub vectors: Arc<VectorIndex>,
    pub pipeline: Arc<IndexingPipeline>,
    pub retriever: Arc<FusionRetriever>,
    pub provider: Arc<dyn InferenceAdapter>,
}

impl Runtime {
    /// Open both stores and wire up the Ollama-backed adapters.
    pub async fn init(config: &MnemoConfig) -> Result<Self, MnemoError> {
        let db = Arc::new(
            Database::open(&config.storage.database_path, config.storage.wal_mode).await?,
        );
        let vectors = Arc::new(
            VectorIndex::open(
                &config.storage.vector_path,
                config.ollama.embedding_dimensions,
            )
            .await?,
        );
        info!(
            database = %config.storage.database_path,
            vectors = %config.storage.vector_path,
            "stores opened"
        );

        let embedder: Arc<dyn EmbeddingAdapter> =
            Arc::new(OllamaEmbedder::new(&config.ollama)?);
        let provider: Arc<dyn InferenceAdapter> =
            Arc::new(OllamaProvider::new(&config.ollama)?);

        let pipeline = Arc::new(IndexingPipeline::new(
            Arc::clone(&db),
            Arc::clone(&vectors),
            Arc::clone(&embedder),
            config.indexing.clone(),
        ));
        let retriever = Arc::new(FusionRetriever::new(
            Arc::clone(&db),
            Arc::clone(&vectors),
            Arc::clone(&embedder),
            config.retrieval.clone(),
        ));

        Ok(Self {
            db,
            vectors,
            pipeline,
            retriever,
            provider,
        })
    }

    /// Checkpoint and close the structured store.
    pub async fn shutdown(&self) -> Result<(), MnemoError> {
        self.db.close().await
    }
}

/// Runs `mnemo reindex`: drives the pending queue and tombstones once.
pub async fn run_reindex(config: MnemoConfig) -> Result<(), MnemoError> {
    let runtime = Runtime::init(&config).await?;
    let report = runtime.pipeline.reconcile().await?;
    println!(
        "indexed {}, dropped {}, failed {}, tombstones cleared {}",
        report.indexed.to_string().green(),
        report.dropped,
        report.failed.to_string().yellow(),
        report.tombstones_cleared
    );
    println!("vector index holds {} embeddings", runtime.vectors.len().await?);
    runtime.shutdown().await?;
    Ok(())
}
