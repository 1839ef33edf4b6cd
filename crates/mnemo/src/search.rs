// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo search` command implementation.

use colored::Colorize;
use mnemo_config::MnemoConfig;
use mnemo_core::types::RetrievalSource;
use mnemo_core::MnemoError;

use crate::runtime::Runtime;

/// Runs `mnemo search`: hybrid retrieval across all conversations.
///
/// No scope is passed, so nothing is excluded as "recent" and every
/// conversation is searched.
pub async fn run_search(config: MnemoConfig, query: &str) -> Result<(), MnemoError> {
    let runtime = Runtime::init(&config).await?;

    let results = runtime.retriever.retrieve_context(query, None).await?;
    if results.is_empty() {
        println!("{}", "no matches".dimmed());
    }
    for result in &results {
        let source = match result.source {
            RetrievalSource::Keyword => "keyword".yellow(),
            RetrievalSource::Semantic => "semantic".blue(),
            RetrievalSource::Hybrid => "hybrid".green(),
        };
        println!(
            "{:.3} [{}] {} {}",
            result.score,
            source,
            result.turn.conversation_id.dimmed(),
            result.snippet()
        );
    }

    runtime.shutdown().await?;
    Ok(())
}
