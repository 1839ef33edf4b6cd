// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama adapter crate: HTTP client, NDJSON stream parsing, and the
//! inference and embedding adapter implementations.

pub mod client;
pub mod embedder;
pub mod ndjson;
pub mod provider;
pub mod types;

pub use client::OllamaClient;
pub use embedder::OllamaEmbedder;
pub use provider::OllamaProvider;
