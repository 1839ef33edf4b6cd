// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector index with brute-force cosine search.
//!
//! Embeddings are stored as f32 LE BLOBs. Queries scan every row; at the
//! scale of a local chat history (thousands of turns) a full scan is
//! faster than maintaining an ANN structure.

use mnemo_core::MnemoError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::types::{blob_to_vec, cosine_similarity, vec_to_blob, EmbeddingRecord, VectorHit};

fn storage_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MnemoError {
    MnemoError::Storage {
        source: Box::new(e),
    }
}

/// The vector store. One row per embedded turn.
pub struct VectorIndex {
    conn: Connection,
    dimensions: usize,
}

impl VectorIndex {
    /// Open (or create) the vector database at `path`.
    pub async fn open(path: &str, dimensions: usize) -> Result<Self, MnemoError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| MnemoError::Storage {
                source: Box::new(e),
            })?;
        }
        let conn = Connection::open(path).await.map_err(|e| MnemoError::Storage {
            source: Box::new(e),
        })?;
        Self::init_schema(&conn).await?;
        debug!(path, dimensions, "vector index opened");
        Ok(Self { conn, dimensions })
    }

    /// In-memory index for tests.
    pub async fn open_in_memory(dimensions: usize) -> Result<Self, MnemoError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| MnemoError::Storage {
                source: Box::new(e),
            })?;
        Self::init_schema(&conn).await?;
        Ok(Self { conn, dimensions })
    }

    async fn init_schema(conn: &Connection) -> Result<(), MnemoError> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 CREATE TABLE IF NOT EXISTS embeddings (
                     turn_id TEXT PRIMARY KEY NOT NULL,
                     conversation_id TEXT NOT NULL,
                     role TEXT NOT NULL,
                     created_at TEXT NOT NULL,
                     vector BLOB NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_embeddings_conversation
                     ON embeddings(conversation_id);",
            )?;
            Ok(())
        })
        .await
        .map_err(storage_err)
    }

    /// Configured embedding dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Insert or replace the vector for a turn.
    ///
    /// Rejects vectors whose length does not match the configured
    /// dimensionality; a silent mismatch would corrupt every later query.
    pub async fn upsert(&self, record: &EmbeddingRecord) -> Result<(), MnemoError> {
        if record.vector.len() != self.dimensions {
            return Err(MnemoError::DimensionMismatch {
                expected: self.dimensions,
                actual: record.vector.len(),
            });
        }
        let turn_id = record.turn_id.clone();
        let conversation_id = record.conversation_id.clone();
        let role = record.role.clone();
        let created_at = record.created_at.clone();
        let blob = vec_to_blob(&record.vector);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO embeddings (turn_id, conversation_id, role, created_at, vector)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![turn_id, conversation_id, role, created_at, blob],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    /// Nearest neighbours by cosine similarity, best first.
    ///
    /// `scope` restricts the scan to a single conversation. Ties break on
    /// recency (newer turn first).
    pub async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        scope: Option<&str>,
    ) -> Result<Vec<VectorHit>, MnemoError> {
        if vector.len() != self.dimensions {
            return Err(MnemoError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        let query_vec = vector.to_vec();
        let scope = scope.map(|s| s.to_string());
        self.conn
            .call(move |conn| {
                let (sql, params): (&str, Vec<&dyn rusqlite::types::ToSql>) = match &scope {
                    Some(conversation_id) => (
                        "SELECT turn_id, conversation_id, created_at, vector
                         FROM embeddings WHERE conversation_id = ?1",
                        vec![conversation_id as &dyn rusqlite::types::ToSql],
                    ),
                    None => (
                        "SELECT turn_id, conversation_id, created_at, vector FROM embeddings",
                        vec![],
                    ),
                };
                let mut stmt = conn.prepare(sql)?;
                let mut scored: Vec<(VectorHit, String)> = stmt
                    .query_map(params.as_slice(), |row| {
                        let turn_id: String = row.get(0)?;
                        let conversation_id: String = row.get(1)?;
                        let created_at: String = row.get(2)?;
                        let blob: Vec<u8> = row.get(3)?;
                        Ok((turn_id, conversation_id, created_at, blob))
                    })?
                    .filter_map(|r| r.ok())
                    .map(|(turn_id, conversation_id, created_at, blob)| {
                        let candidate = blob_to_vec(&blob);
                        let score = if candidate.len() == query_vec.len() {
                            cosine_similarity(&query_vec, &candidate)
                        } else {
                            0.0
                        };
                        (
                            VectorHit {
                                turn_id,
                                conversation_id,
                                score,
                            },
                            created_at,
                        )
                    })
                    .collect();

                scored.sort_by(|(a, a_ts), (b, b_ts)| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| b_ts.cmp(a_ts))
                });
                scored.truncate(top_k);
                Ok(scored.into_iter().map(|(hit, _)| hit).collect::<Vec<_>>())
            })
            .await
            .map_err(storage_err)
    }

    /// Remove the vector for a single turn. Returns whether a row existed.
    pub async fn delete_turn(&self, turn_id: &str) -> Result<bool, MnemoError> {
        let turn_id = turn_id.to_string();
        self.conn
            .call(move |conn| {
                let changed = conn.execute(
                    "DELETE FROM embeddings WHERE turn_id = ?1",
                    rusqlite::params![turn_id],
                )?;
                Ok(changed > 0)
            })
            .await
            .map_err(storage_err)
    }

    /// Remove every vector belonging to a conversation. Returns the row count.
    pub async fn delete_by_conversation(&self, conversation_id: &str) -> Result<usize, MnemoError> {
        let conversation_id = conversation_id.to_string();
        self.conn
            .call(move |conn| {
                let changed = conn.execute(
                    "DELETE FROM embeddings WHERE conversation_id = ?1",
                    rusqlite::params![conversation_id],
                )?;
                Ok(changed)
            })
            .await
            .map_err(storage_err)
    }

    /// Whether a turn has a stored vector.
    pub async fn contains(&self, turn_id: &str) -> Result<bool, MnemoError> {
        let turn_id = turn_id.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM embeddings WHERE turn_id = ?1",
                    rusqlite::params![turn_id],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(storage_err)
    }

    /// Total stored vectors.
    pub async fn len(&self) -> Result<usize, MnemoError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(storage_err)
    }
}
