// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn persistence and keyword search.

use mnemo_core::types::{Role, Turn};
use mnemo_core::MnemoError;
use rusqlite::params;

use crate::database::Database;

/// Insert a turn and bump the parent conversation's activity timestamp.
///
/// Returns `NotFound` if the conversation does not exist.
pub async fn insert_turn(db: &Database, turn: &Turn) -> Result<(), MnemoError> {
    let turn = turn.clone();
    let conversation_id = turn.conversation_id.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM conversations WHERE id = ?1",
                params![turn.conversation_id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO turns (id, conversation_id, role, content, created_at, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    turn.id,
                    turn.conversation_id,
                    turn.role.as_str(),
                    turn.content,
                    turn.created_at,
                    turn.deleted as i64,
                ],
            )?;
            tx.execute(
                "UPDATE conversations
                 SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![turn.conversation_id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if !inserted {
        return Err(MnemoError::NotFound {
            kind: "conversation",
            id: conversation_id,
        });
    }
    Ok(())
}

/// Get all live turns for a conversation in chronological order.
pub async fn get_conversation_turns(
    db: &Database,
    conversation_id: &str,
    limit: Option<usize>,
) -> Result<Vec<Turn>, MnemoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let turns = match limit {
                Some(limit) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, role, content, created_at, deleted
                         FROM turns WHERE conversation_id = ?1 AND deleted = 0
                         ORDER BY created_at ASC, rowid ASC LIMIT ?2",
                    )?;
                    stmt.query_map(params![conversation_id, limit], row_to_turn)?
                        .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, role, content, created_at, deleted
                         FROM turns WHERE conversation_id = ?1 AND deleted = 0
                         ORDER BY created_at ASC, rowid ASC",
                    )?;
                    stmt.query_map(params![conversation_id], row_to_turn)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The last `n` live turns of a conversation, oldest first.
pub async fn recent_turns(
    db: &Database,
    conversation_id: &str,
    n: usize,
) -> Result<Vec<Turn>, MnemoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, created_at, deleted
                 FROM turns WHERE conversation_id = ?1 AND deleted = 0
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let mut turns = stmt
                .query_map(params![conversation_id, n], row_to_turn)?
                .collect::<Result<Vec<_>, _>>()?;
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// IDs of the last `n` live turns of a conversation.
pub async fn recent_turn_ids(
    db: &Database,
    conversation_id: &str,
    n: usize,
) -> Result<Vec<String>, MnemoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM turns WHERE conversation_id = ?1 AND deleted = 0
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let ids = stmt
                .query_map(params![conversation_id, n], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Hydrate turns by ID. Soft-deleted and unknown IDs are silently dropped.
pub async fn get_turns_by_ids(db: &Database, ids: &[String]) -> Result<Vec<Turn>, MnemoError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = (1..=ids.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT id, conversation_id, role, content, created_at, deleted
                 FROM turns WHERE deleted = 0 AND id IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql)?;
            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();
            let turns = stmt
                .query_map(param_refs.as_slice(), row_to_turn)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Case-insensitive keyword search over live turn content, newest first.
///
/// The query is split on whitespace and each token becomes a LIKE clause;
/// a turn matches if it contains any token. A blank query matches nothing.
pub async fn search_turns(
    db: &Database,
    query: &str,
    limit: usize,
) -> Result<Vec<Turn>, MnemoError> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|t| format!("%{}%", crate::queries::escape_like(&t.to_lowercase())))
        .collect();
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    db.connection()
        .call(move |conn| {
            let clauses = (1..=tokens.len())
                .map(|i| format!("lower(content) LIKE ?{i} ESCAPE '\\'"))
                .collect::<Vec<_>>()
                .join(" OR ");
            let sql = format!(
                "SELECT id, conversation_id, role, content, created_at, deleted
                 FROM turns WHERE deleted = 0 AND ({clauses})
                 ORDER BY created_at DESC, rowid DESC LIMIT ?{}",
                tokens.len() + 1
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut param_refs: Vec<&dyn rusqlite::types::ToSql> = tokens
                .iter()
                .map(|t| t as &dyn rusqlite::types::ToSql)
                .collect();
            let limit = limit as i64;
            param_refs.push(&limit);
            let turns = stmt
                .query_map(param_refs.as_slice(), row_to_turn)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a single turn deleted without removing the row.
///
/// The same transaction records a turn tombstone so the vector row is
/// removed even if the process dies before the vector delete runs, and
/// drops any pending-embed entry for the turn.
///
/// Returns `NotFound` if no live turn has this ID.
pub async fn soft_delete_turn(db: &Database, id: &str) -> Result<(), MnemoError> {
    let id_owned = id.to_string();
    let found = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE turns SET deleted = 1 WHERE id = ?1 AND deleted = 0",
                params![id_owned],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            tx.execute(
                "INSERT OR REPLACE INTO turn_tombstones (turn_id) VALUES (?1)",
                params![id_owned],
            )?;
            tx.execute(
                "DELETE FROM pending_index WHERE turn_id = ?1",
                params![id_owned],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if !found {
        return Err(MnemoError::NotFound {
            kind: "turn",
            id: id.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn row_to_turn(row: &rusqlite::Row) -> Result<Turn, rusqlite::Error> {
    let role: String = row.get(2)?;
    Ok(Turn {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: Role::from_str_value(&role),
        content: row.get(3)?,
        created_at: row.get(4)?,
        deleted: row.get::<_, i64>(5)? != 0,
    })
}
