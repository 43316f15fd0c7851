// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commits reassembled turns into the conversation store.

use std::sync::Arc;

use async_trait::async_trait;
use confab_core::types::{ConversationId, Message};
use confab_core::{ConfabError, TurnCommitter};
use tracing::debug;

use crate::store::ConversationStore;

/// [`TurnCommitter`] backed by a [`ConversationStore`].
#[derive(Debug, Clone)]
pub struct MemoryCommitter {
    store: Arc<ConversationStore>,
}

impl MemoryCommitter {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TurnCommitter for MemoryCommitter {
    async fn commit_turn(
        &self,
        conversation_id: &ConversationId,
        user: Message,
        assistant: Message,
    ) -> Result<(), ConfabError> {
        debug!(
            conversation_id = %conversation_id,
            assistant_len = assistant.content.len(),
            "committing turn"
        );
        self.store.append_turn(conversation_id, user, assistant).await
    }
}
