// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session lifecycle.
//!
//! A session owns one conversation and moves through
//! New -> Active -> Suspended -> Deleted. The conversation row is created
//! lazily on the first exchange, so an abandoned session leaves nothing
//! behind. Deleted is terminal; any further operation reports the
//! conversation as missing.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use mnemo_config::MnemoConfig;
use mnemo_core::traits::InferenceAdapter;
use mnemo_core::types::{CompletionChunk, Conversation, Role, TokenUsage, Turn};
use mnemo_core::MnemoError;
use mnemo_recall::{now_timestamp, FusionRetriever, IndexingPipeline};
use mnemo_storage::{queries, Database};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::prompt;

/// System prompt used when the config does not provide one.
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are mnemo, a helpful assistant with memory of past conversations.";

/// States in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but no exchange yet; no conversation row exists.
    New,
    /// At least one exchange has happened.
    Active,
    /// Parked by the user; resumable.
    Suspended,
    /// Conversation removed. Terminal.
    Deleted,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::New => write!(f, "new"),
            SessionState::Active => write!(f, "active"),
            SessionState::Suspended => write!(f, "suspended"),
            SessionState::Deleted => write!(f, "deleted"),
        }
    }
}

/// Everything consumed while collecting a response stream.
#[derive(Debug)]
pub struct StreamOutcome {
    /// Accumulated response text, possibly partial if cancelled.
    pub text: String,
    /// Token usage from the final chunk, when the stream completed.
    pub usage: Option<TokenUsage>,
    /// Whether the stream was cancelled before completion.
    pub cancelled: bool,
}

/// Drain a completion stream, invoking `on_text` per text delta.
///
/// Cancellation wins over pending chunks; the partial text collected so
/// far is returned so the caller can persist it.
pub async fn collect_stream<F>(
    mut stream: Pin<Box<dyn Stream<Item = Result<CompletionChunk, MnemoError>> + Send>>,
    cancel: &CancellationToken,
    mut on_text: F,
) -> Result<StreamOutcome, MnemoError>
where
    F: FnMut(&str),
{
    let mut text = String::new();
    let mut usage = None;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(collected = text.len(), "stream cancelled");
                return Ok(StreamOutcome { text, usage, cancelled: true });
            }
            chunk = stream.next() => {
                match chunk {
                    Some(Ok(chunk)) => {
                        if let Some(t) = &chunk.text {
                            text.push_str(t);
                            on_text(t);
                        }
                        if let Some(u) = chunk.usage {
                            usage = Some(u);
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
        }
    }
    Ok(StreamOutcome {
        text,
        usage,
        cancelled: false,
    })
}

/// One conversation session bound to the stores and the inference backend.
pub struct ChatSession {
    conversation_id: Option<String>,
    state: SessionState,
    db: Arc<Database>,
    pipeline: Arc<IndexingPipeline>,
    retriever: Arc<FusionRetriever>,
    provider: Arc<dyn InferenceAdapter>,
    system_prompt: String,
    history_window: usize,
    model: String,
    temperature: f32,
}

impl ChatSession {
    /// Start a fresh session. No conversation row is created until the
    /// first call to [`send`](Self::send).
    pub fn new(
        db: Arc<Database>,
        pipeline: Arc<IndexingPipeline>,
        retriever: Arc<FusionRetriever>,
        provider: Arc<dyn InferenceAdapter>,
        config: &MnemoConfig,
    ) -> Self {
        Self {
            conversation_id: None,
            state: SessionState::New,
            db,
            pipeline,
            retriever,
            provider,
            system_prompt: config
                .agent
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            history_window: config.agent.history_window,
            model: config.ollama.model.clone(),
            temperature: config.ollama.temperature,
        }
    }

    /// Resume an existing conversation.
    ///
    /// Returns `NotFound` if the conversation does not exist.
    pub async fn resume(
        db: Arc<Database>,
        pipeline: Arc<IndexingPipeline>,
        retriever: Arc<FusionRetriever>,
        provider: Arc<dyn InferenceAdapter>,
        config: &MnemoConfig,
        conversation_id: &str,
    ) -> Result<Self, MnemoError> {
        let conversation = queries::conversations::get_conversation(&db, conversation_id)
            .await?
            .ok_or_else(|| MnemoError::NotFound {
                kind: "conversation",
                id: conversation_id.to_string(),
            })?;

        let mut session = Self::new(db, pipeline, retriever, provider, config);
        session.conversation_id = Some(conversation.id);
        session.state = SessionState::Active;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Send a user message and return the response stream.
    ///
    /// Persists the user turn, retrieves cross-conversation context, and
    /// starts streaming. The caller consumes the stream (see
    /// [`collect_stream`]) and then calls [`finish_turn`](Self::finish_turn)
    /// with the collected text, partial or not.
    pub async fn send(
        &mut self,
        input: &str,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<CompletionChunk, MnemoError>> + Send>>, MnemoError>
    {
        self.ensure_live()?;

        let conversation_id = match &self.conversation_id {
            Some(id) => id.clone(),
            None => {
                let conversation = Conversation {
                    id: uuid::Uuid::new_v4().to_string(),
                    title: prompt::derive_title(input),
                    model: self.model.clone(),
                    created_at: now_timestamp(),
                    updated_at: now_timestamp(),
                };
                queries::conversations::create_conversation(&self.db, &conversation).await?;
                debug!(conversation_id = %conversation.id, "conversation created");
                self.conversation_id = Some(conversation.id.clone());
                conversation.id
            }
        };
        self.state = SessionState::Active;

        // Context from past conversations; failures here must not block
        // the exchange.
        let context = match self
            .retriever
            .retrieve_context(input, Some(&conversation_id))
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "context retrieval failed, continuing without");
                Vec::new()
            }
        };

        // Dialogue window before the new turn is persisted, so the input
        // does not appear twice.
        let window =
            queries::turns::recent_turns(&self.db, &conversation_id, self.history_window).await?;

        self.pipeline
            .persist_turn(&conversation_id, Role::User, input)
            .await?;

        let request = prompt::assemble_request(
            &self.system_prompt,
            &context,
            &window,
            input,
            &self.model,
            self.temperature,
        );
        self.provider.stream(request).await
    }

    /// Persist the assistant's response text, partial or complete.
    ///
    /// Empty text (a stream cancelled before the first token) persists
    /// nothing and returns `None`.
    pub async fn finish_turn(&mut self, text: &str) -> Result<Option<Turn>, MnemoError> {
        self.ensure_live()?;
        let Some(conversation_id) = self.conversation_id.clone() else {
            return Ok(None);
        };
        if text.is_empty() {
            return Ok(None);
        }
        let turn = self
            .pipeline
            .persist_turn(&conversation_id, Role::Assistant, text)
            .await?;
        Ok(Some(turn))
    }

    /// Park the session. It can be resumed later by conversation ID.
    pub fn suspend(&mut self) {
        if self.state == SessionState::Active {
            self.state = SessionState::Suspended;
        }
    }

    /// Delete the conversation from both stores. Terminal.
    ///
    /// Returns the number of turns removed. Deleting a session that never
    /// produced a conversation is a no-op.
    pub async fn delete(&mut self) -> Result<usize, MnemoError> {
        self.ensure_live()?;
        let removed = match &self.conversation_id {
            Some(id) => self.pipeline.delete_conversation(id).await?,
            None => 0,
        };
        self.state = SessionState::Deleted;
        Ok(removed)
    }

    fn ensure_live(&self) -> Result<(), MnemoError> {
        if self.state == SessionState::Deleted {
            return Err(MnemoError::NotFound {
                kind: "conversation",
                id: self
                    .conversation_id
                    .clone()
                    .unwrap_or_else(|| "deleted".to_string()),
            });
        }
        Ok(())
    }
}
