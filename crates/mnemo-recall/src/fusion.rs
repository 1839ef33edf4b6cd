// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval fusion: keyword and semantic search merged by weighted sum.
//!
//! Each leg produces scores in [0, 1]. The fused score is
//! `keyword_weight * k + semantic_weight * s` with defaults 0.4 / 0.6,
//! so a turn found by both legs outranks a turn found by one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use mnemo_config::RetrievalConfig;
use mnemo_core::traits::EmbeddingAdapter;
use mnemo_core::types::{EmbeddingInput, RetrievalResult, RetrievalSource, Turn};
use mnemo_core::MnemoError;
use mnemo_storage::{queries, Database};
use mnemo_vector::VectorIndex;
use tracing::{debug, warn};

/// Keyword match density for a turn against a query.
///
/// An exact phrase match scores 1.0. Otherwise the score is the fraction
/// of distinct query tokens present in the content. Case-insensitive.
pub fn keyword_score(query: &str, content: &str) -> f32 {
    let query_lower = query.trim().to_lowercase();
    if query_lower.is_empty() {
        return 0.0;
    }
    let content_lower = content.to_lowercase();
    if content_lower.contains(&query_lower) {
        return 1.0;
    }
    let tokens: HashSet<&str> = query_lower.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let matched = tokens
        .iter()
        .filter(|t| content_lower.contains(*t))
        .count();
    matched as f32 / tokens.len() as f32
}

/// Whitespace-token count used for the context budget.
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Merge the two score maps into `(turn_id, fused_score, source)` tuples,
/// best first. Ties are left for the caller to break on recency.
pub fn fuse(
    keyword: &HashMap<String, f32>,
    semantic: &HashMap<String, f32>,
    keyword_weight: f32,
    semantic_weight: f32,
) -> Vec<(String, f32, RetrievalSource)> {
    let mut fused: Vec<(String, f32, RetrievalSource)> = keyword
        .keys()
        .chain(semantic.keys())
        .collect::<HashSet<_>>()
        .into_iter()
        .map(|id| {
            let k = keyword.get(id).copied();
            let s = semantic.get(id).copied();
            let source = match (k, s) {
                (Some(_), Some(_)) => RetrievalSource::Hybrid,
                (Some(_), None) => RetrievalSource::Keyword,
                _ => RetrievalSource::Semantic,
            };
            let score = keyword_weight * k.unwrap_or(0.0) + semantic_weight * s.unwrap_or(0.0);
            (id.clone(), score, source)
        })
        .collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

/// Hybrid retriever over the structured and vector stores.
pub struct FusionRetriever {
    db: Arc<Database>,
    vectors: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingAdapter>,
    config: RetrievalConfig,
}

impl FusionRetriever {
    pub fn new(
        db: Arc<Database>,
        vectors: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingAdapter>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            db,
            vectors,
            embedder,
            config,
        }
    }

    /// Retrieve context turns for a query.
    ///
    /// Runs both search legs, fuses, hydrates turns from the structured
    /// store, and applies the result cap and token budget. Turns whose
    /// vectors outlive a delete drop out at hydration. When `scope` names
    /// the active conversation, its most recent turns are excluded; they
    /// are already in the dialogue window. If embedding the query fails,
    /// retrieval degrades to keyword-only instead of failing the exchange.
    pub async fn retrieve_context(
        &self,
        query: &str,
        scope: Option<&str>,
    ) -> Result<Vec<RetrievalResult>, MnemoError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let excluded: HashSet<String> = match scope {
            Some(conversation_id) => queries::turns::recent_turn_ids(
                &self.db,
                conversation_id,
                self.config.exclude_recent_turns,
            )
            .await?
            .into_iter()
            .collect(),
            None => HashSet::new(),
        };

        // Keyword leg. Hits come with full turns, cache them for hydration.
        let keyword_hits =
            queries::turns::search_turns(&self.db, query, self.config.candidate_limit).await?;
        let mut keyword_scores: HashMap<String, f32> = HashMap::new();
        let mut turn_cache: HashMap<String, Turn> = HashMap::new();
        for turn in keyword_hits {
            let score = keyword_score(query, &turn.content);
            if score > 0.0 {
                keyword_scores.insert(turn.id.clone(), score);
                turn_cache.insert(turn.id.clone(), turn);
            }
        }

        // Semantic leg, degraded to empty when the embedder is down.
        let semantic_scores = match self.semantic_search(query).await {
            Ok(scores) => scores,
            Err(e) if e.is_transient() => {
                warn!(error = %e, "query embedding failed, keyword-only retrieval");
                HashMap::new()
            }
            Err(e) => return Err(e),
        };

        let fused = fuse(
            &keyword_scores,
            &semantic_scores,
            self.config.keyword_weight,
            self.config.semantic_weight,
        );

        // Hydrate semantic-only hits; missing rows were deleted and drop out.
        let missing: Vec<String> = fused
            .iter()
            .filter(|(id, _, _)| !turn_cache.contains_key(id))
            .map(|(id, _, _)| id.clone())
            .collect();
        for turn in queries::turns::get_turns_by_ids(&self.db, &missing).await? {
            turn_cache.insert(turn.id.clone(), turn);
        }

        let mut candidates: Vec<RetrievalResult> = fused
            .into_iter()
            .filter(|(id, _, _)| !excluded.contains(id))
            .filter_map(|(id, score, source)| {
                turn_cache.remove(&id).map(|turn| RetrievalResult {
                    turn,
                    score,
                    source,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.turn.created_at.cmp(&a.turn.created_at))
        });

        // Result cap and token budget. Oversized snippets are skipped, not
        // truncated, so a later smaller snippet can still fit.
        let mut selected = Vec::new();
        let mut used_tokens = 0;
        for candidate in candidates {
            if selected.len() >= self.config.max_results {
                break;
            }
            let cost = estimate_tokens(&candidate.turn.content);
            if used_tokens + cost > self.config.max_context_tokens {
                continue;
            }
            used_tokens += cost;
            selected.push(candidate);
        }

        debug!(
            query_len = query.len(),
            results = selected.len(),
            used_tokens,
            "retrieval complete"
        );
        Ok(selected)
    }

    async fn semantic_search(&self, query: &str) -> Result<HashMap<String, f32>, MnemoError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![query.to_string()],
            })
            .await?;
        let query_embedding = output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MnemoError::Internal("embedding returned no vectors".to_string()))?;

        let hits = self
            .vectors
            .query(&query_embedding, self.config.candidate_limit, None)
            .await?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                // Negative cosine means dissimilar; clamp into [0, 1].
                let score = hit.score.max(0.0);
                (score >= self.config.similarity_threshold).then_some((hit.turn_id, score))
            })
            .collect())
    }
}
