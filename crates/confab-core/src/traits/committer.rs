// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sink for completed conversation turns.

use async_trait::async_trait;

use crate::error::ConfabError;
use crate::types::{ConversationId, Message};

/// Appends one turn (user message, then assistant message) to a history.
///
/// Both messages must land adjacently and in that order even when other
/// turns for the same conversation commit concurrently.
#[async_trait]
pub trait TurnCommitter: Send + Sync + 'static {
    async fn commit_turn(
        &self,
        conversation_id: &ConversationId,
        user: Message,
        assistant: Message,
    ) -> Result<(), ConfabError>;
}
