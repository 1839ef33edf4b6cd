// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly: system prompt, retrieved context, dialogue window.

use mnemo_core::types::{ChatMessage, CompletionRequest, RetrievalResult, Turn};

/// Maximum length of a conversation title derived from the opening message.
const MAX_TITLE_CHARS: usize = 60;

/// Derive a conversation title from its first user message.
///
/// First line only, truncated on a char boundary with an ellipsis.
pub fn derive_title(input: &str) -> String {
    let first_line = input.trim().lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "untitled".to_string();
    }
    if first_line.chars().count() <= MAX_TITLE_CHARS {
        return first_line.to_string();
    }
    let truncated: String = first_line.chars().take(MAX_TITLE_CHARS).collect();
    format!("{}...", truncated.trim_end())
}

/// Build the completion request for one exchange.
///
/// Retrieved snippets go into the system prompt so they are framed as
/// background knowledge rather than dialogue. The window holds the last
/// turns of the active conversation, oldest first; the new user input is
/// appended last.
pub fn assemble_request(
    system_prompt: &str,
    context: &[RetrievalResult],
    window: &[Turn],
    input: &str,
    model: &str,
    temperature: f32,
) -> CompletionRequest {
    let mut system = system_prompt.to_string();
    if !context.is_empty() {
        system.push_str(
            "\n\nBased on previous conversations, here is some relevant information:\n",
        );
        for result in context {
            system.push_str("- ");
            system.push_str(result.snippet());
            system.push('\n');
        }
    }

    let mut messages: Vec<ChatMessage> = window
        .iter()
        .map(|turn| ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        })
        .collect();
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: input.to_string(),
    });

    CompletionRequest {
        model: model.to_string(),
        system: Some(system),
        messages,
        temperature: Some(temperature),
        stream: true,
    }
}
