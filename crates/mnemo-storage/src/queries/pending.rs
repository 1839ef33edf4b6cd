// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bookkeeping for the indexing pipeline: the pending-embed queue and the
//! vector tombstones left behind by conversation and turn deletes.

use mnemo_core::types::{PendingIndex, TurnTombstone, VectorTombstone};
use mnemo_core::MnemoError;
use rusqlite::params;

use crate::database::Database;

/// Queue a turn for later embedding. Re-queueing an already-pending turn
/// is a no-op.
pub async fn enqueue_pending(
    db: &Database,
    turn_id: &str,
    conversation_id: &str,
) -> Result<(), MnemoError> {
    let turn_id = turn_id.to_string();
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO pending_index (turn_id, conversation_id)
                 VALUES (?1, ?2)",
                params![turn_id, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Oldest pending entries first, capped at `limit`.
pub async fn list_pending(db: &Database, limit: usize) -> Result<Vec<PendingIndex>, MnemoError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT turn_id, conversation_id, attempts, created_at
                 FROM pending_index ORDER BY created_at ASC, rowid ASC LIMIT ?1",
            )?;
            let entries = stmt
                .query_map(params![limit], |row| {
                    Ok(PendingIndex {
                        turn_id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        attempts: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bump the attempt counter for a pending entry.
pub async fn record_attempt(db: &Database, turn_id: &str) -> Result<(), MnemoError> {
    let turn_id = turn_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE pending_index SET attempts = attempts + 1 WHERE turn_id = ?1",
                params![turn_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove a turn from the pending queue after a successful embed (or when
/// giving up on it).
pub async fn remove_pending(db: &Database, turn_id: &str) -> Result<(), MnemoError> {
    let turn_id = turn_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM pending_index WHERE turn_id = ?1",
                params![turn_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All outstanding vector tombstones.
pub async fn list_tombstones(db: &Database) -> Result<Vec<VectorTombstone>, MnemoError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT conversation_id, created_at FROM vector_tombstones
                 ORDER BY created_at ASC",
            )?;
            let tombstones = stmt
                .query_map([], |row| {
                    Ok(VectorTombstone {
                        conversation_id: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tombstones)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Clear a tombstone once the vector store delete is confirmed.
pub async fn remove_tombstone(db: &Database, conversation_id: &str) -> Result<(), MnemoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM vector_tombstones WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All outstanding turn tombstones.
pub async fn list_turn_tombstones(db: &Database) -> Result<Vec<TurnTombstone>, MnemoError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT turn_id, created_at FROM turn_tombstones
                 ORDER BY created_at ASC",
            )?;
            let tombstones = stmt
                .query_map([], |row| {
                    Ok(TurnTombstone {
                        turn_id: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tombstones)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Clear a turn tombstone once the vector row delete is confirmed.
pub async fn remove_turn_tombstone(db: &Database, turn_id: &str) -> Result<(), MnemoError> {
    let turn_id = turn_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM turn_tombstones WHERE turn_id = ?1",
                params![turn_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        enqueue_pending(&db, "t1", "c1").await.unwrap();
        enqueue_pending(&db, "t1", "c1").await.unwrap();

        let pending = list_pending(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].turn_id, "t1");
        assert_eq!(pending[0].attempts, 0);
    }

    #[tokio::test]
    async fn record_attempt_increments_counter() {
        let db = Database::open_in_memory().await.unwrap();
        enqueue_pending(&db, "t1", "c1").await.unwrap();
        record_attempt(&db, "t1").await.unwrap();
        record_attempt(&db, "t1").await.unwrap();

        let pending = list_pending(&db, 10).await.unwrap();
        assert_eq!(pending[0].attempts, 2);
    }

    #[tokio::test]
    async fn remove_pending_clears_entry() {
        let db = Database::open_in_memory().await.unwrap();
        enqueue_pending(&db, "t1", "c1").await.unwrap();
        enqueue_pending(&db, "t2", "c1").await.unwrap();
        remove_pending(&db, "t1").await.unwrap();

        let pending = list_pending(&db, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].turn_id, "t2");
    }

    #[tokio::test]
    async fn list_pending_respects_limit() {
        let db = Database::open_in_memory().await.unwrap();
        for i in 0..5 {
            enqueue_pending(&db, &format!("t{i}"), "c1").await.unwrap();
        }
        let pending = list_pending(&db, 3).await.unwrap();
        assert_eq!(pending.len(), 3);
    }

    #[tokio::test]
    async fn tombstone_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        db.connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO vector_tombstones (conversation_id) VALUES ('c1')",
                    [],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();

        let tombstones = list_tombstones(&db).await.unwrap();
        assert_eq!(tombstones.len(), 1);
        assert_eq!(tombstones[0].conversation_id, "c1");

        remove_tombstone(&db, "c1").await.unwrap();
        assert!(list_tombstones(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn turn_tombstone_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        db.connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO turn_tombstones (turn_id) VALUES ('t1')",
                    [],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();

        let tombstones = list_turn_tombstones(&db).await.unwrap();
        assert_eq!(tombstones.len(), 1);
        assert_eq!(tombstones[0].turn_id, "t1");

        remove_turn_tombstone(&db, "t1").await.unwrap();
        assert!(list_turn_tombstones(&db).await.unwrap().is_empty());
    }
}
