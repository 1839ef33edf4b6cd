// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured SQLite store for mnemo.
//!
//! Conversations and turns live here as the source of truth; the vector
//! store only ever holds derived data. WAL mode, embedded migrations, and
//! async access through tokio-rusqlite's background thread.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
