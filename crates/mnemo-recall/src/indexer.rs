// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexing pipeline: persist a turn, embed it, and keep the two stores
//! reconciled.
//!
//! The structured store is the source of truth. A turn is always persisted
//! there first; embedding failures park the turn in the pending queue
//! instead of failing the chat exchange. `reconcile` drains the queue and
//! finishes vector deletes recorded as tombstones.

use std::sync::Arc;

use mnemo_config::IndexingConfig;
use mnemo_core::traits::EmbeddingAdapter;
use mnemo_core::types::{EmbeddingInput, Role, Turn};
use mnemo_core::MnemoError;
use mnemo_storage::{queries, Database};
use mnemo_vector::{EmbeddingRecord, VectorIndex};
use tracing::{debug, warn};

/// ISO 8601 timestamp matching the SQL `strftime('%Y-%m-%dT%H:%M:%fZ')`
/// defaults, so Rust-side and SQL-side timestamps sort together.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Outcome of a reconcile pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pending turns successfully embedded and indexed.
    pub indexed: usize,
    /// Pending entries dropped because the turn no longer exists.
    pub dropped: usize,
    /// Pending turns that failed again and stay queued.
    pub failed: usize,
    /// Tombstones whose vector rows were confirmed removed.
    pub tombstones_cleared: usize,
}

/// Writes turns to both stores and repairs divergence between them.
pub struct IndexingPipeline {
    db: Arc<Database>,
    vectors: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingAdapter>,
    config: IndexingConfig,
}

impl IndexingPipeline {
    pub fn new(
        db: Arc<Database>,
        vectors: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: IndexingConfig,
    ) -> Self {
        Self {
            db,
            vectors,
            embedder,
            config,
        }
    }

    /// Persist a new turn and index its embedding.
    ///
    /// The turn lands in the structured store unconditionally. Embedding is
    /// retried with exponential backoff; if every attempt fails the turn is
    /// queued for the next reconcile and the call still succeeds.
    pub async fn persist_turn(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Turn, MnemoError> {
        let turn = Turn {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: now_timestamp(),
            deleted: false,
        };
        queries::turns::insert_turn(&self.db, &turn).await?;

        match self.embed_with_retry(&turn.content).await {
            Ok(vector) => {
                let record = EmbeddingRecord {
                    turn_id: turn.id.clone(),
                    conversation_id: turn.conversation_id.clone(),
                    role: turn.role.as_str().to_string(),
                    created_at: turn.created_at.clone(),
                    vector,
                };
                if let Err(e) = self.vectors.upsert(&record).await {
                    warn!(turn_id = %turn.id, error = %e, "vector upsert failed, queueing for reconcile");
                    queries::pending::enqueue_pending(&self.db, &turn.id, conversation_id).await?;
                }
            }
            Err(e) => {
                warn!(turn_id = %turn.id, error = %e, "embedding failed, queueing for reconcile");
                queries::pending::enqueue_pending(&self.db, &turn.id, conversation_id).await?;
            }
        }

        Ok(turn)
    }

    /// Delete a conversation from both stores.
    ///
    /// The structured delete commits first, together with a tombstone. The
    /// vector delete follows; if it fails, the tombstone survives and the
    /// next reconcile retries it. Returns the number of turns removed.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<usize, MnemoError> {
        let removed =
            queries::conversations::delete_conversation(&self.db, conversation_id).await?;

        match self.vectors.delete_by_conversation(conversation_id).await {
            Ok(_) => {
                queries::pending::remove_tombstone(&self.db, conversation_id).await?;
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "vector delete failed, tombstone retained");
            }
        }
        Ok(removed)
    }

    /// Soft-delete a single turn in both stores.
    ///
    /// The structured soft delete commits first, together with a turn
    /// tombstone. The vector delete follows; if it fails, the tombstone
    /// survives and the next reconcile retries it.
    pub async fn delete_turn(&self, turn_id: &str) -> Result<(), MnemoError> {
        queries::turns::soft_delete_turn(&self.db, turn_id).await?;

        match self.vectors.delete_turn(turn_id).await {
            Ok(_) => {
                queries::pending::remove_turn_tombstone(&self.db, turn_id).await?;
            }
            Err(e) => {
                warn!(turn_id, error = %e, "vector delete failed, tombstone retained");
            }
        }
        Ok(())
    }

    /// Drain the pending queue and clear resolvable tombstones.
    pub async fn reconcile(&self) -> Result<ReconcileReport, MnemoError> {
        let mut report = ReconcileReport::default();

        let pending =
            queries::pending::list_pending(&self.db, self.config.reconcile_batch).await?;
        for entry in pending {
            let turns =
                queries::turns::get_turns_by_ids(&self.db, &[entry.turn_id.clone()]).await?;
            let Some(turn) = turns.into_iter().next() else {
                // Turn was deleted while queued.
                queries::pending::remove_pending(&self.db, &entry.turn_id).await?;
                report.dropped += 1;
                continue;
            };

            match self.embed_once(&turn.content).await {
                Ok(vector) => {
                    let record = EmbeddingRecord {
                        turn_id: turn.id.clone(),
                        conversation_id: turn.conversation_id.clone(),
                        role: turn.role.as_str().to_string(),
                        created_at: turn.created_at.clone(),
                        vector,
                    };
                    self.vectors.upsert(&record).await?;
                    queries::pending::remove_pending(&self.db, &turn.id).await?;
                    report.indexed += 1;
                }
                Err(e) => {
                    debug!(turn_id = %turn.id, error = %e, "pending turn failed again");
                    queries::pending::record_attempt(&self.db, &turn.id).await?;
                    report.failed += 1;
                }
            }
        }

        for tombstone in queries::pending::list_tombstones(&self.db).await? {
            match self
                .vectors
                .delete_by_conversation(&tombstone.conversation_id)
                .await
            {
                Ok(_) => {
                    queries::pending::remove_tombstone(&self.db, &tombstone.conversation_id)
                        .await?;
                    report.tombstones_cleared += 1;
                }
                Err(e) => {
                    warn!(
                        conversation_id = %tombstone.conversation_id,
                        error = %e,
                        "tombstone cleanup failed, will retry"
                    );
                }
            }
        }

        for tombstone in queries::pending::list_turn_tombstones(&self.db).await? {
            match self.vectors.delete_turn(&tombstone.turn_id).await {
                Ok(_) => {
                    queries::pending::remove_turn_tombstone(&self.db, &tombstone.turn_id).await?;
                    report.tombstones_cleared += 1;
                }
                Err(e) => {
                    warn!(
                        turn_id = %tombstone.turn_id,
                        error = %e,
                        "turn tombstone cleanup failed, will retry"
                    );
                }
            }
        }

        Ok(report)
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![text.to_string()],
            })
            .await?;
        output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MnemoError::Internal("embedding returned no vectors".to_string()))
    }

    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        let mut backoff = self.config.backoff_ms;
        let mut last_error = None;
        for attempt in 0..self.config.max_embed_attempts {
            if attempt > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                backoff *= 2;
            }
            match self.embed_once(text).await {
                Ok(vector) => return Ok(vector),
                Err(e) if e.is_transient() => {
                    debug!(attempt, error = %e, "embedding attempt failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| MnemoError::Internal("embedding retries exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::types::Conversation;
    use mnemo_test_utils::MockEmbedder;

    async fn setup(
        embedder: Arc<MockEmbedder>,
        config: IndexingConfig,
    ) -> (Arc<Database>, Arc<VectorIndex>, IndexingPipeline) {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        let vectors = Arc::new(VectorIndex::open_in_memory(embedder.dimensions()).await.unwrap());
        let conv = Conversation {
            id: "c1".to_string(),
            title: "test".to_string(),
            model: "llama3.2".to_string(),
            created_at: now_timestamp(),
            updated_at: now_timestamp(),
        };
        queries::conversations::create_conversation(&db, &conv).await.unwrap();
        let pipeline = IndexingPipeline::new(
            Arc::clone(&db),
            Arc::clone(&vectors),
            embedder,
            config,
        );
        (db, vectors, pipeline)
    }

    fn fast_config() -> IndexingConfig {
        IndexingConfig {
            max_embed_attempts: 3,
            backoff_ms: 1,
            reconcile_batch: 32,
        }
    }

    #[tokio::test]
    async fn persist_turn_writes_both_stores() {
        let embedder = Arc::new(MockEmbedder::new(16));
        let (db, vectors, pipeline) = setup(Arc::clone(&embedder), fast_config()).await;

        let turn = pipeline
            .persist_turn("c1", Role::User, "hello world")
            .await
            .unwrap();

        let stored = queries::turns::get_conversation_turns(&db, "c1", None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, turn.id);
        assert!(vectors.contains(&turn.id).await.unwrap());
        assert!(queries::pending::list_pending(&db, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persist_turn_retries_past_transient_failures() {
        let embedder = Arc::new(MockEmbedder::new(16));
        embedder.fail_times(2);
        let (_db, vectors, pipeline) = setup(Arc::clone(&embedder), fast_config()).await;

        let turn = pipeline
            .persist_turn("c1", Role::User, "eventually indexed")
            .await
            .unwrap();
        assert!(vectors.contains(&turn.id).await.unwrap());
    }

    #[tokio::test]
    async fn persist_turn_queues_on_exhausted_retries() {
        let embedder = Arc::new(MockEmbedder::new(16));
        embedder.fail_times(10);
        let (db, vectors, pipeline) = setup(Arc::clone(&embedder), fast_config()).await;

        let turn = pipeline
            .persist_turn("c1", Role::User, "embedding is down")
            .await
            .unwrap();

        // Turn survives in the structured store even though indexing failed.
        let stored = queries::turns::get_conversation_turns(&db, "c1", None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!vectors.contains(&turn.id).await.unwrap());

        let pending = queries::pending::list_pending(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].turn_id, turn.id);
    }

    #[tokio::test]
    async fn reconcile_indexes_queued_turns() {
        let embedder = Arc::new(MockEmbedder::new(16));
        embedder.fail_times(10);
        let (db, vectors, pipeline) = setup(Arc::clone(&embedder), fast_config()).await;

        let turn = pipeline
            .persist_turn("c1", Role::User, "catch me later")
            .await
            .unwrap();
        assert!(!vectors.contains(&turn.id).await.unwrap());

        // Embedder recovered; queue pressure remaining is zero.
        embedder.fail_times(0);
        let report = pipeline.reconcile().await.unwrap();
        assert_eq!(report.indexed, 1);
        assert_eq!(report.failed, 0);
        assert!(vectors.contains(&turn.id).await.unwrap());
        assert!(queries::pending::list_pending(&db, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reconcile_drops_entries_for_deleted_turns() {
        let embedder = Arc::new(MockEmbedder::new(16));
        let (db, _vectors, pipeline) = setup(Arc::clone(&embedder), fast_config()).await;

        queries::pending::enqueue_pending(&db, "ghost-turn", "c1").await.unwrap();
        let report = pipeline.reconcile().await.unwrap();
        assert_eq!(report.dropped, 1);
        assert!(queries::pending::list_pending(&db, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reconcile_records_failed_attempts() {
        let embedder = Arc::new(MockEmbedder::new(16));
        embedder.fail_times(10);
        let (db, _vectors, pipeline) = setup(Arc::clone(&embedder), fast_config()).await;

        pipeline.persist_turn("c1", Role::User, "still failing").await.unwrap();
        embedder.fail_times(10);
        let report = pipeline.reconcile().await.unwrap();
        assert_eq!(report.failed, 1);

        let pending = queries::pending::list_pending(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
    }

    #[tokio::test]
    async fn delete_conversation_removes_vectors_and_tombstone() {
        let embedder = Arc::new(MockEmbedder::new(16));
        let (db, vectors, pipeline) = setup(Arc::clone(&embedder), fast_config()).await;

        let turn = pipeline
            .persist_turn("c1", Role::User, "to be deleted")
            .await
            .unwrap();
        assert!(vectors.contains(&turn.id).await.unwrap());

        let removed = pipeline.delete_conversation("c1").await.unwrap();
        assert_eq!(removed, 1);
        assert!(!vectors.contains(&turn.id).await.unwrap());
        assert!(queries::pending::list_tombstones(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_turn_removes_vector_row_and_tombstone() {
        let embedder = Arc::new(MockEmbedder::new(16));
        let (db, vectors, pipeline) = setup(Arc::clone(&embedder), fast_config()).await;

        let turn = pipeline
            .persist_turn("c1", Role::User, "forget this one")
            .await
            .unwrap();
        assert!(vectors.contains(&turn.id).await.unwrap());

        pipeline.delete_turn(&turn.id).await.unwrap();
        assert!(!vectors.contains(&turn.id).await.unwrap());
        assert!(queries::pending::list_turn_tombstones(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reconcile_clears_orphaned_turn_vectors() {
        let embedder = Arc::new(MockEmbedder::new(16));
        let (db, vectors, pipeline) = setup(Arc::clone(&embedder), fast_config()).await;

        let turn = pipeline
            .persist_turn("c1", Role::User, "deleted out of band")
            .await
            .unwrap();

        // Structured-store soft delete only; the vector row is now orphaned
        // and the tombstone is the record of that.
        queries::turns::soft_delete_turn(&db, &turn.id).await.unwrap();
        assert!(vectors.contains(&turn.id).await.unwrap());

        let report = pipeline.reconcile().await.unwrap();
        assert_eq!(report.tombstones_cleared, 1);
        assert!(!vectors.contains(&turn.id).await.unwrap());
        assert!(queries::pending::list_turn_tombstones(&db).await.unwrap().is_empty());
    }
}
