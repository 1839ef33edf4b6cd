// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a local Ollama server.
//!
//! Handles request construction, NDJSON streaming, and transient error
//! retry. The base URL comes from configuration so tests can point it at
//! a mock server.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use mnemo_config::OllamaConfig;
use mnemo_core::MnemoError;
use tracing::{debug, warn};

use crate::ndjson;
use crate::types::{
    ApiErrorBody, ChatChunk, ChatRequest, EmbeddingsRequest, EmbeddingsResponse, TagModel,
    TagsResponse, VersionResponse,
};

/// HTTP client for the Ollama REST API.
///
/// Retries transient failures (429, 500, 503) once after a 1-second delay.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    default_model: String,
    max_retries: u32,
}

impl OllamaClient {
    /// Creates a client from the Ollama section of the config.
    pub fn new(config: &OllamaConfig) -> Result<Self, MnemoError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MnemoError::Inference {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_model: config.model.clone(),
            max_retries: 1,
        })
    }

    /// Returns the default model identifier.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Sends a non-streaming chat request.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatChunk, MnemoError> {
        let mut req = request.clone();
        req.stream = false;
        let url = format!("{}/api/chat", self.base_url);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying chat request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&req)
                .send()
                .await
                .map_err(|e| MnemoError::Inference {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "chat response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| MnemoError::Inference {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str::<ChatChunk>(&body).map_err(|e| {
                    MnemoError::Inference {
                        message: format!("failed to parse chat response: {e}"),
                        source: Some(Box::new(e)),
                    }
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(MnemoError::Inference {
                    message: format!("Ollama returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            return Err(inference_error(status, response).await);
        }

        Err(last_error.unwrap_or_else(|| MnemoError::Inference {
            message: "chat request failed after retries".into(),
            source: None,
        }))
    }

    /// Sends a streaming chat request and returns a stream of chunks.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ChatChunk, MnemoError>> + Send>>, MnemoError>
    {
        let mut req = request.clone();
        req.stream = true;
        let url = format!("{}/api/chat", self.base_url);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying streaming request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&req)
                .send()
                .await
                .map_err(|e| MnemoError::Inference {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "streaming response received");

            if status.is_success() {
                return Ok(ndjson::parse_chunk_stream(response));
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(MnemoError::Inference {
                    message: format!("Ollama returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            return Err(inference_error(status, response).await);
        }

        Err(last_error.unwrap_or_else(|| MnemoError::Inference {
            message: "streaming request failed after retries".into(),
            source: None,
        }))
    }

    /// Embeds a single prompt via `/api/embeddings`.
    pub async fn embeddings(&self, model: &str, prompt: &str) -> Result<Vec<f32>, MnemoError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let req = EmbeddingsRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
        };

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying embeddings request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&req)
                .send()
                .await
                .map_err(|e| MnemoError::Embedding {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "embeddings response received");

            if status.is_success() {
                let parsed: EmbeddingsResponse =
                    response.json().await.map_err(|e| MnemoError::Embedding {
                        message: format!("failed to parse embeddings response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return Ok(parsed.embedding);
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(MnemoError::Embedding {
                    message: format!("Ollama returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(api_err) => format!("Ollama error: {}", api_err.error),
                Err(_) => format!("Ollama returned {status}: {body}"),
            };
            return Err(MnemoError::Embedding {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| MnemoError::Embedding {
            message: "embeddings request failed after retries".into(),
            source: None,
        }))
    }

    /// Installed models from `/api/tags`.
    pub async fn list_models(&self) -> Result<Vec<TagModel>, MnemoError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MnemoError::Inference {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(inference_error(status, response).await);
        }
        let parsed: TagsResponse = response.json().await.map_err(|e| MnemoError::Inference {
            message: format!("failed to parse tags response: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(parsed.models)
    }

    /// Server version from `/api/version`. Doubles as the health probe.
    pub async fn version(&self) -> Result<String, MnemoError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MnemoError::Inference {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(inference_error(status, response).await);
        }
        let parsed: VersionResponse =
            response.json().await.map_err(|e| MnemoError::Inference {
                message: format!("failed to parse version response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.version)
    }
}

async fn inference_error(status: reqwest::StatusCode, response: reqwest::Response) -> MnemoError {
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(api_err) => format!("Ollama error: {}", api_err.error),
        Err(_) => format!("Ollama returned {status}: {body}"),
    };
    MnemoError::Inference {
        message,
        source: None,
    }
}

/// HTTP status codes worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiChatMessage;
    use futures::StreamExt;
    use wiremock::matchers::{body_json_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OllamaClient {
        let config = OllamaConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        OllamaClient::new(&config).unwrap()
    }

    fn test_request() -> ChatRequest {
        ChatRequest {
            model: "llama3.2".into(),
            messages: vec![ApiChatMessage {
                role: "user".into(),
                content: "Hello".into(),
            }],
            stream: false,
            options: None,
        }
    }

    #[tokio::test]
    async fn chat_success() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "Hi there!"},
            "done": true,
            "prompt_eval_count": 10,
            "eval_count": 5
        });
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let chunk = client.chat(&test_request()).await.unwrap();
        assert_eq!(chunk.message.unwrap().content, "Hi there!");
        assert_eq!(chunk.prompt_eval_count, Some(10));
    }

    #[tokio::test]
    async fn chat_retries_on_500() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        let body = serde_json::json!({
            "message": {"role": "assistant", "content": "After retry"},
            "done": true
        });
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let chunk = client.chat(&test_request()).await.unwrap();
        assert_eq!(chunk.message.unwrap().content, "After retry");
    }

    #[tokio::test]
    async fn chat_fails_on_404_with_error_body() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"error": "model 'nope' not found"});
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.chat(&test_request()).await.unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[tokio::test]
    async fn chat_stream_yields_chunks() {
        let server = MockServer::start().await;
        let ndjson = concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"one \"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"two\"},\"done\":false}\n",
            "{\"done\":true,\"eval_count\":2}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/x-ndjson")
                    .set_body_string(ndjson),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let mut stream = client.chat_stream(&test_request()).await.unwrap();

        let mut text = String::new();
        let mut done = false;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if let Some(message) = chunk.message {
                text.push_str(&message.content);
            }
            done = chunk.done;
        }
        assert_eq!(text, "one two");
        assert!(done);
    }

    #[tokio::test]
    async fn embeddings_success() {
        let server = MockServer::start().await;
        let expected = serde_json::json!({
            "model": "nomic-embed-text",
            "prompt": "hello world"
        });
        let body = serde_json::json!({"embedding": [0.1, 0.2, 0.3]});
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_json_string(expected.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let vector = client.embeddings("nomic-embed-text", "hello world").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embeddings_failure_is_embedding_error() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"error": "model not loaded"});
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(404).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.embeddings("x", "y").await.unwrap_err();
        assert!(matches!(err, MnemoError::Embedding { .. }));
    }

    #[tokio::test]
    async fn list_models_parses_tags() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "models": [
                {"name": "llama3.2:latest", "size": 2019393189u64},
                {"name": "nomic-embed-text:latest"}
            ]
        });
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let models = client.list_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "llama3.2:latest");
    }

    #[tokio::test]
    async fn version_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"version": "0.5.4"})),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert_eq!(client.version().await.unwrap(), "0.5.4");
    }
}
