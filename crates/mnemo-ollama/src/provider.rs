// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`InferenceAdapter`] implementation backed by Ollama chat completion.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use mnemo_config::OllamaConfig;
use mnemo_core::traits::{InferenceAdapter, PluginAdapter};
use mnemo_core::types::{
    AdapterType, CompletionChunk, CompletionRequest, CompletionResponse, HealthStatus, ModelInfo,
    TokenUsage,
};
use mnemo_core::MnemoError;

use crate::client::OllamaClient;
use crate::types::{ApiChatMessage, ChatChunk, ChatOptions, ChatRequest};

/// Chat completion provider backed by a local Ollama server.
pub struct OllamaProvider {
    client: OllamaClient,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig) -> Result<Self, MnemoError> {
        Ok(Self {
            client: OllamaClient::new(config)?,
        })
    }

    fn to_chat_request(&self, request: &CompletionRequest, stream: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(ApiChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| ApiChatMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        }));

        let model = if request.model.is_empty() {
            self.client.default_model().to_string()
        } else {
            request.model.clone()
        };

        ChatRequest {
            model,
            messages,
            stream,
            options: request.temperature.map(|t| ChatOptions {
                temperature: Some(t),
            }),
        }
    }
}

fn chunk_usage(chunk: &ChatChunk) -> Option<TokenUsage> {
    match (chunk.prompt_eval_count, chunk.eval_count) {
        (None, None) => None,
        (prompt, completion) => Some(TokenUsage {
            prompt_tokens: prompt.unwrap_or(0),
            completion_tokens: completion.unwrap_or(0),
        }),
    }
}

#[async_trait]
impl PluginAdapter for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        match self.client.version().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl InferenceAdapter for OllamaProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, MnemoError> {
        let chat_request = self.to_chat_request(&request, false);
        let model = chat_request.model.clone();
        let chunk = self.client.chat(&chat_request).await?;
        Ok(CompletionResponse {
            content: chunk
                .message
                .as_ref()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            model,
            usage: chunk_usage(&chunk),
        })
    }

    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<
        Pin<Box<dyn Stream<Item = Result<CompletionChunk, MnemoError>> + Send>>,
        MnemoError,
    > {
        let chat_request = self.to_chat_request(&request, true);
        let chunks = self.client.chat_stream(&chat_request).await?;
        let mapped = chunks.map(|result| {
            result.map(|chunk| CompletionChunk {
                text: chunk.message.as_ref().map(|m| m.content.clone()),
                done: chunk.done,
                usage: chunk_usage(&chunk),
            })
        });
        Ok(Box::pin(mapped))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, MnemoError> {
        let models = self.client.list_models().await?;
        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                name: m.name,
                size: m.size,
                modified_at: m.modified_at,
            })
            .collect())
    }
}
