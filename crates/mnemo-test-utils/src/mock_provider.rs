// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock inference adapter for deterministic testing.
//!
//! `MockInference` implements `InferenceAdapter` with pre-configured
//! responses, enabling fast, CI-runnable tests without a running Ollama.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, Stream};
use tokio::sync::Mutex;

use mnemo_core::traits::{InferenceAdapter, PluginAdapter};
use mnemo_core::types::{
    AdapterType, CompletionChunk, CompletionRequest, CompletionResponse, HealthStatus, ModelInfo,
    TokenUsage,
};
use mnemo_core::MnemoError;

/// A mock inference backend that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned.
pub struct MockInference {
    responses: Arc<Mutex<VecDeque<String>>>,
}

impl MockInference {
    /// Create a new mock with an empty response queue.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a mock pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
        }
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: String) {
        self.responses.lock().await.push_back(text);
    }

    async fn next_response(&self) -> String {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string())
    }
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockInference {
    fn name(&self) -> &str {
        "mock-inference"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl InferenceAdapter for MockInference {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, MnemoError> {
        let text = self.next_response().await;
        Ok(CompletionResponse {
            content: text,
            model: request.model,
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
            }),
        })
    }

    async fn stream(
        &self,
        _request: CompletionRequest,
    ) -> Result<
        Pin<Box<dyn Stream<Item = Result<CompletionChunk, MnemoError>> + Send>>,
        MnemoError,
    > {
        let text = self.next_response().await;

        // One chunk per word, mimicking token-batch streaming, then a
        // final done chunk with usage.
        let words: Vec<&str> = text.split_inclusive(' ').collect();
        let mut chunks: Vec<Result<CompletionChunk, MnemoError>> = words
            .into_iter()
            .map(|w| {
                Ok(CompletionChunk {
                    text: Some(w.to_string()),
                    done: false,
                    usage: None,
                })
            })
            .collect();
        chunks.push(Ok(CompletionChunk {
            text: None,
            done: true,
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
            }),
        }));

        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, MnemoError> {
        Ok(vec![ModelInfo {
            name: "mock-model".to_string(),
            size: None,
            modified_at: None,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "mock-model".to_string(),
            system: None,
            messages: vec![],
            temperature: None,
            stream: false,
        }
    }

    #[tokio::test]
    async fn default_response_when_queue_empty() {
        let provider = MockInference::new();
        let resp = provider.complete(request()).await.unwrap();
        assert_eq!(resp.content, "mock response");
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let provider =
            MockInference::with_responses(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(provider.complete(request()).await.unwrap().content, "first");
        assert_eq!(provider.complete(request()).await.unwrap().content, "second");
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            "mock response"
        );
    }

    #[tokio::test]
    async fn stream_reassembles_to_full_text() {
        let provider = MockInference::with_responses(vec!["hello streaming world".to_string()]);
        let mut stream = provider.stream(request()).await.unwrap();

        let mut text = String::new();
        let mut saw_done = false;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if let Some(t) = chunk.text {
                text.push_str(&t);
            }
            if chunk.done {
                saw_done = true;
                assert!(chunk.usage.is_some());
            }
        }
        assert_eq!(text, "hello streaming world");
        assert!(saw_done);
    }
}
