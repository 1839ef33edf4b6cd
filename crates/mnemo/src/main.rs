// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mnemo - a local chat assistant with long-term memory.
//!
//! This is the binary entry point for the mnemo CLI.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use mnemo_core::MnemoError;
use tracing_subscriber::EnvFilter;

mod doctor;
mod history;
mod runtime;
mod search;
mod shell;

/// Mnemo - a local chat assistant with long-term memory.
#[derive(Parser, Debug)]
#[command(name = "mnemo", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch an interactive chat session (default).
    Shell {
        /// Resume an existing conversation by ID.
        #[arg(long)]
        resume: Option<String>,
    },
    /// List past conversations.
    History {
        /// Maximum number of conversations to show.
        #[arg(long, default_value_t = 20)]
        limit: i64,
        /// Filter by a case-insensitive keyword in titles or content.
        #[arg(long)]
        keyword: Option<String>,
        /// Only conversations updated at or after this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<String>,
        /// Only conversations updated at or before this RFC 3339 timestamp.
        #[arg(long)]
        until: Option<String>,
    },
    /// Search past conversations with hybrid retrieval.
    Search {
        /// The query text.
        query: String,
    },
    /// Delete a conversation and its embeddings.
    Delete {
        /// Conversation ID to delete.
        conversation_id: String,
    },
    /// Re-drive pending embeddings and clear stale tombstones.
    Reindex,
    /// Check the health of the stores and the Ollama backend.
    Doctor,
}

#[tokio::main]
async fn main() {
    // Load and validate configuration at startup.
    let config = match mnemo_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            mnemo_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.agent.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result: Result<(), MnemoError> = match cli.command {
        Some(Commands::Shell { resume }) => shell::run_shell(config, resume).await,
        None => shell::run_shell(config, None).await,
        Some(Commands::History {
            limit,
            keyword,
            since,
            until,
        }) => history::run_history(config, limit, keyword, since, until).await,
        Some(Commands::Search { query }) => search::run_search(config, &query).await,
        Some(Commands::Delete { conversation_id }) => {
            shell::run_delete(config, &conversation_id).await
        }
        Some(Commands::Reindex) => runtime::run_reindex(config).await,
        Some(Commands::Doctor) => doctor::run_doctor(config).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed)
        let config =
            mnemo_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.agent.name, "mnemo");
    }
}
