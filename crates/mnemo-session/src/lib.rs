// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session lifecycle and prompt assembly.

pub mod prompt;
pub mod session;

pub use session::{collect_stream, ChatSession, SessionState, StreamOutcome};
