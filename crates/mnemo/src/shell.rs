// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo shell` command implementation.
//!
//! Launches an interactive REPL with colored prompt, streaming output,
//! and readline history. Ctrl+C during a response cancels the stream and
//! keeps the partial text; Ctrl+C at the prompt exits.

use std::io::Write;

use colored::Colorize;
use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_session::{collect_stream, ChatSession};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::runtime::Runtime;

/// Runs the `mnemo shell` interactive REPL.
///
/// Starts a fresh session, or resumes the conversation named by
/// `resume`. The conversation row itself is only created once the first
/// message is sent.
pub async fn run_shell(config: MnemoConfig, resume: Option<String>) -> Result<(), MnemoError> {
    let runtime = Runtime::init(&config).await?;

    let mut session = match &resume {
        Some(conversation_id) => {
            ChatSession::resume(
                runtime.db.clone(),
                runtime.pipeline.clone(),
                runtime.retriever.clone(),
                runtime.provider.clone(),
                &config,
                conversation_id,
            )
            .await?
        }
        None => ChatSession::new(
            runtime.db.clone(),
            runtime.pipeline.clone(),
            runtime.retriever.clone(),
            runtime.provider.clone(),
            &config,
        ),
    };

    let mut rl = DefaultEditor::new()
        .map_err(|e| MnemoError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "mnemo shell".bold().green());
    if let Some(id) = session.conversation_id() {
        println!("resuming conversation {}", id.dimmed());
    }
    println!(
        "Type {} to exit, {} to start a fresh conversation.\n",
        "/quit".yellow(),
        "/new".yellow()
    );

    let prompt = format!("{}> ", "mnemo".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed == "/new" {
                    session.suspend();
                    session = ChatSession::new(
                        runtime.db.clone(),
                        runtime.pipeline.clone(),
                        runtime.retriever.clone(),
                        runtime.provider.clone(),
                        &config,
                    );
                    println!("{}", "started a new conversation".dimmed());
                    continue;
                }
                if trimmed == "/id" {
                    match session.conversation_id() {
                        Some(id) => println!("{id}"),
                        None => println!("{}", "no conversation yet".dimmed()),
                    }
                    continue;
                }
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if let Err(e) = handle_message(&mut session, trimmed).await {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at the prompt
                break;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D
                break;
            }
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    session.suspend();
    if let Some(id) = session.conversation_id() {
        println!(
            "{}",
            format!("resume later with: mnemo shell --resume {id}").dimmed()
        );
    }
    runtime.shutdown().await?;

    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Handles a single exchange: sends the input, streams the response to
/// stdout, and persists whatever text arrived, partial or complete.
async fn handle_message(session: &mut ChatSession, input: &str) -> Result<(), MnemoError> {
    let stream = session.send(input).await?;

    // Ctrl+C during the stream cancels it without leaving the REPL.
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            guard.cancel();
        }
    });

    let outcome = collect_stream(stream, &cancel, |text| {
        print!("{text}");
        std::io::stdout().flush().ok();
    })
    .await;
    ctrl_c.abort();

    let outcome = outcome?;
    println!();
    if outcome.cancelled {
        println!("{}", "(interrupted)".dimmed());
    }
    if let Some(usage) = &outcome.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "exchange complete"
        );
    }

    session.finish_turn(&outcome.text).await?;
    Ok(())
}

/// Runs `mnemo delete <conversation-id>`.
pub async fn run_delete(config: MnemoConfig, conversation_id: &str) -> Result<(), MnemoError> {
    let runtime = Runtime::init(&config).await?;
    let removed = runtime.pipeline.delete_conversation(conversation_id).await?;
    println!(
        "deleted conversation {} ({} turns)",
        conversation_id.yellow(),
        removed
    );
    runtime.shutdown().await?;
    Ok(())
}
