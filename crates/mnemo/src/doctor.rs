// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo doctor` command implementation.
//!
//! Runs a series of health checks against the stores and the Ollama
//! backend and prints one line per check. Exits nonzero if any check
//! fails so the command works in scripts.

use colored::Colorize;
use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_ollama::OllamaClient;
use mnemo_storage::Database;
use mnemo_vector::VectorIndex;

/// Runs `mnemo doctor`.
pub async fn run_doctor(config: MnemoConfig) -> Result<(), MnemoError> {
    let mut failures = 0usize;

    // Structured store.
    match Database::open(&config.storage.database_path, config.storage.wal_mode).await {
        Ok(db) => {
            ok(&format!(
                "structured store at {}",
                config.storage.database_path
            ));
            db.close().await.ok();
        }
        Err(e) => {
            fail(&format!("structured store: {e}"));
            failures += 1;
        }
    }

    // Vector store.
    match VectorIndex::open(
        &config.storage.vector_path,
        config.ollama.embedding_dimensions,
    )
    .await
    {
        Ok(vectors) => match vectors.len().await {
            Ok(count) => ok(&format!(
                "vector store at {} ({count} embeddings)",
                config.storage.vector_path
            )),
            Err(e) => {
                fail(&format!("vector store: {e}"));
                failures += 1;
            }
        },
        Err(e) => {
            fail(&format!("vector store: {e}"));
            failures += 1;
        }
    }

    // Ollama server and models.
    match OllamaClient::new(&config.ollama) {
        Ok(client) => {
            match client.version().await {
                Ok(version) => {
                    ok(&format!(
                        "ollama {} at {}",
                        version, config.ollama.base_url
                    ));

                    match client.list_models().await {
                        Ok(models) => {
                            failures += check_model(&models, &config.ollama.model, "chat");
                            failures += check_model(
                                &models,
                                &config.ollama.embedding_model,
                                "embedding",
                            );
                        }
                        Err(e) => {
                            fail(&format!("model listing: {e}"));
                            failures += 1;
                        }
                    }

                    // A real embedding round-trip catches dimension drift.
                    match client
                        .embeddings(&config.ollama.embedding_model, "mnemo doctor")
                        .await
                    {
                        Ok(vector) if vector.len() == config.ollama.embedding_dimensions => {
                            ok(&format!("embeddings return {} dimensions", vector.len()));
                        }
                        Ok(vector) => {
                            fail(&format!(
                                "embedding dimensions: configured {}, model returns {}",
                                config.ollama.embedding_dimensions,
                                vector.len()
                            ));
                            failures += 1;
                        }
                        Err(e) => {
                            fail(&format!("embeddings: {e}"));
                            failures += 1;
                        }
                    }
                }
                Err(e) => {
                    fail(&format!(
                        "ollama unreachable at {}: {e}",
                        config.ollama.base_url
                    ));
                    failures += 1;
                }
            }
        }
        Err(e) => {
            fail(&format!("ollama client: {e}"));
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(MnemoError::Internal(format!(
            "{failures} check(s) failed"
        )));
    }
    println!("{}", "all checks passed".green());
    Ok(())
}

fn check_model(
    models: &[mnemo_ollama::types::TagModel],
    name: &str,
    kind: &str,
) -> usize {
    // Ollama reports tags as "name:tag"; a bare configured name matches
    // any tag of that model.
    let present = models
        .iter()
        .any(|m| m.name == name || m.name.split(':').next() == Some(name));
    if present {
        ok(&format!("{kind} model {name} is available"));
        0
    } else {
        fail(&format!(
            "{kind} model {name} not found; run: ollama pull {name}"
        ));
        1
    }
}

fn ok(message: &str) {
    println!("{} {message}", "ok".green());
}

fn fail(message: &str) {
    println!("{} {message}", "fail".red());
}
