// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference adapter trait for chat completion backends.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionChunk, CompletionRequest, CompletionResponse, ModelInfo};

/// Adapter for LLM chat completion backends.
///
/// Implementations own request construction, transport, and retry for
/// transient failures. All errors surface as [`MnemoError::Inference`].
#[async_trait]
pub trait InferenceAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, MnemoError>;

    /// Sends a completion request and returns a stream of incremental chunks.
    ///
    /// The final chunk has `done = true` and carries token usage. Dropping
    /// the stream cancels the underlying request.
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<
        Pin<Box<dyn Stream<Item = Result<CompletionChunk, MnemoError>> + Send>>,
        MnemoError,
    >;

    /// Enumerates the models available on the backend.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, MnemoError>;
}
