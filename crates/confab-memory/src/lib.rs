// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation memory for Confab.
//!
//! [`ConversationStore`] is an explicitly constructed, injectable map from
//! conversation id to an append-only history. Each history serializes its own
//! appends; different conversations never contend. An optional [`Journal`]
//! mirrors every committed message to a per-conversation JSON lines file and
//! replays it on first access.

pub mod committer;
pub mod journal;
pub mod store;

pub use committer::MemoryCommitter;
pub use journal::Journal;
pub use store::{ConversationHistory, ConversationStore};
