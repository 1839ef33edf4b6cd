// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types stored in the structured store.
//!
//! These are the shared core types; re-exported here so query modules and
//! downstream crates can name them from one place.

pub use mnemo_core::types::{
    Conversation, ConversationFilter, ConversationSummary, DateRange, PendingIndex, Role, Turn,
    TurnTombstone, VectorTombstone,
};
