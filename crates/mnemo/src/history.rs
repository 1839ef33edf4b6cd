// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo history` command implementation.

use colored::Colorize;
use mnemo_config::MnemoConfig;
use mnemo_core::types::{ConversationFilter, DateRange};
use mnemo_core::MnemoError;
use mnemo_storage::queries;

use crate::runtime::Runtime;

/// Runs `mnemo history`: lists conversations, newest activity first.
///
/// Conversations with no turns never show up; a session that was opened
/// and abandoned leaves no row behind in the first place.
pub async fn run_history(
    config: MnemoConfig,
    limit: i64,
    keyword: Option<String>,
    since: Option<String>,
    until: Option<String>,
) -> Result<(), MnemoError> {
    let runtime = Runtime::init(&config).await?;

    let date_range = if since.is_some() || until.is_some() {
        Some(DateRange {
            start: since,
            end: until,
        })
    } else {
        None
    };
    let filter = ConversationFilter {
        date_range,
        keyword,
        limit: Some(limit),
        offset: None,
    };

    let summaries = queries::conversations::list_conversations(&runtime.db, &filter).await?;
    if summaries.is_empty() {
        println!("{}", "no conversations found".dimmed());
    }
    for summary in &summaries {
        println!(
            "{}  {}  {} ({} turns)",
            summary.id.dimmed(),
            summary.updated_at,
            summary.title.bold(),
            summary.turn_count
        );
        if let Some(first) = &summary.first_turn {
            println!("    {}", preview(first).dimmed());
        }
    }

    runtime.shutdown().await?;
    Ok(())
}

/// First line of the opening message, clipped for display.
fn preview(text: &str) -> String {
    const MAX: usize = 80;
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= MAX {
        line.to_string()
    } else {
        let clipped: String = line.chars().take(MAX).collect();
        format!("{clipped}...")
    }
}
