// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! NDJSON stream parser for Ollama streaming responses.
//!
//! Ollama emits one JSON object per line rather than SSE. Byte chunks from
//! the network do not align with line boundaries, so a carry-over buffer
//! accumulates bytes until a full line is available.

use std::pin::Pin;

use futures::stream::{Stream, StreamExt};
use mnemo_core::MnemoError;

use crate::types::ChatChunk;

fn parse_line(line: &str) -> Result<ChatChunk, MnemoError> {
    serde_json::from_str::<ChatChunk>(line).map_err(|e| MnemoError::Inference {
        message: format!("failed to parse stream chunk: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parses a reqwest streaming response into a stream of [`ChatChunk`]s.
///
/// The stream ends after the chunk with `done: true`, after the first parse
/// error, or when the connection closes. A trailing line without a final
/// newline is still parsed.
pub fn parse_chunk_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<ChatChunk, MnemoError>> + Send>> {
    let bytes = Box::pin(response.bytes_stream());
    let state = (bytes, Vec::<u8>::new(), false);

    Box::pin(futures::stream::unfold(
        state,
        |(mut bytes, mut buffer, finished)| async move {
            if finished {
                return None;
            }
            loop {
                if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&raw);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return match parse_line(line) {
                        Ok(chunk) => {
                            let done = chunk.done;
                            Some((Ok(chunk), (bytes, buffer, done)))
                        }
                        Err(e) => Some((Err(e), (bytes, buffer, true))),
                    };
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        return Some((
                            Err(MnemoError::Inference {
                                message: format!("stream read failed: {e}"),
                                source: Some(Box::new(e)),
                            }),
                            (bytes, buffer, true),
                        ));
                    }
                    None => {
                        let line = String::from_utf8_lossy(&buffer).trim().to_string();
                        buffer.clear();
                        if line.is_empty() {
                            return None;
                        }
                        return match parse_line(&line) {
                            Ok(chunk) => Some((Ok(chunk), (bytes, buffer, true))),
                            Err(e) => Some((Err(e), (bytes, buffer, true))),
                        };
                    }
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_ndjson_response(body: &str) -> reqwest::Response {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/x-ndjson")
                    .set_body_string(body.to_string()),
            )
            .mount(&server)
            .await;
        reqwest::get(&server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn parses_chunk_sequence() {
        let body = concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"lo\"},\"done\":false}\n",
            "{\"done\":true,\"prompt_eval_count\":5,\"eval_count\":2}\n",
        );
        let response = mock_ndjson_response(body).await;
        let mut stream = parse_chunk_stream(response);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.message.unwrap().content, "Hel");
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.message.unwrap().content, "lo");
        let last = stream.next().await.unwrap().unwrap();
        assert!(last.done);
        assert_eq!(last.eval_count, Some(2));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_ends_after_done_chunk() {
        let body = concat!(
            "{\"done\":true}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"never seen\"},\"done\":false}\n",
        );
        let response = mock_ndjson_response(body).await;
        let mut stream = parse_chunk_stream(response);

        let first = stream.next().await.unwrap().unwrap();
        assert!(first.done);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let body = "\n\n{\"message\":{\"role\":\"assistant\",\"content\":\"hi\"},\"done\":false}\n\n{\"done\":true}\n";
        let response = mock_ndjson_response(body).await;
        let mut stream = parse_chunk_stream(response);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.message.unwrap().content, "hi");
        let last = stream.next().await.unwrap().unwrap();
        assert!(last.done);
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_parsed() {
        let body = "{\"message\":{\"role\":\"assistant\",\"content\":\"hi\"},\"done\":false}\n{\"done\":true}";
        let response = mock_ndjson_response(body).await;
        let mut stream = parse_chunk_stream(response);

        stream.next().await.unwrap().unwrap();
        let last = stream.next().await.unwrap().unwrap();
        assert!(last.done);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_line_yields_error_and_ends() {
        let body = "not json at all\n{\"done\":true}\n";
        let response = mock_ndjson_response(body).await;
        let mut stream = parse_chunk_stream(response);

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, MnemoError::Inference { .. }));
        assert!(stream.next().await.is_none());
    }
}
