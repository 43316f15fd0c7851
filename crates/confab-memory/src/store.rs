// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed collection of append-only conversation histories.

use std::io;
use std::sync::Arc;

use confab_core::types::{ConversationId, Message};
use confab_core::ConfabError;
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::journal::Journal;

#[derive(Debug, Default)]
struct HistoryState {
    messages: Vec<Message>,
    loaded: bool,
}

/// One conversation's ordered messages.
///
/// All access goes through a per-history lock, which is also held while the
/// journal is written, so the file order always matches memory order.
#[derive(Debug)]
pub struct ConversationHistory {
    id: ConversationId,
    journal: Option<Journal>,
    state: Mutex<HistoryState>,
}

impl ConversationHistory {
    fn new(id: ConversationId, journal: Option<Journal>) -> Self {
        // Nothing to replay without a journal.
        let loaded = journal.is_none();
        Self {
            id,
            journal,
            state: Mutex::new(HistoryState {
                messages: Vec::new(),
                loaded,
            }),
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Acquires the history lock, replaying the journal until a replay succeeds.
    ///
    /// Messages committed while the journal was unreadable stay after the
    /// replayed ones.
    async fn lock(&self) -> MutexGuard<'_, HistoryState> {
        let mut state = self.state.lock().await;
        if !state.loaded {
            if let Some(journal) = &self.journal {
                match journal.load(&self.id).await {
                    Ok(mut replayed) => {
                        debug!(
                            conversation_id = %self.id,
                            count = replayed.len(),
                            "replayed conversation journal"
                        );
                        replayed.append(&mut state.messages);
                        state.messages = replayed;
                        state.loaded = true;
                    }
                    Err(err) => warn!(
                        conversation_id = %self.id,
                        error = %err,
                        "failed to replay conversation journal, will retry"
                    ),
                }
            }
        }
        state
    }

    /// Appends messages as one unit.
    ///
    /// The in-memory append always succeeds. A journal failure is returned
    /// after the messages are already visible in memory. Nothing is written
    /// to a journal that has not been replayed yet.
    pub async fn extend(&self, messages: Vec<Message>) -> Result<(), ConfabError> {
        let mut state = self.lock().await;
        state.messages.extend(messages.iter().cloned());
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        if !state.loaded {
            return Err(ConfabError::Storage {
                source: Box::new(io::Error::other(
                    "journal not replayed, turn kept in memory only",
                )),
            });
        }
        journal.append(&self.id, &messages).await
    }

    pub async fn append(&self, message: Message) -> Result<(), ConfabError> {
        self.extend(vec![message]).await
    }

    /// Copy of every message at the time of the call.
    pub async fn snapshot(&self) -> Vec<Message> {
        self.lock().await.messages.clone()
    }

    /// Copy of the last `window` messages.
    pub async fn recent(&self, window: usize) -> Vec<Message> {
        let state = self.lock().await;
        let start = state.messages.len().saturating_sub(window);
        state.messages[start..].to_vec()
    }

    pub async fn len(&self) -> usize {
        self.lock().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Process-wide keyed collection of histories.
///
/// Construct one per server or shell and share it through an `Arc`.
#[derive(Debug, Default)]
pub struct ConversationStore {
    histories: DashMap<ConversationId, Arc<ConversationHistory>>,
    journal: Option<Journal>,
}

impl ConversationStore {
    /// In-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that mirrors histories to `journal`.
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            histories: DashMap::new(),
            journal: Some(journal),
        }
    }

    /// Returns the history for `id`, creating an empty one on first reference.
    ///
    /// Concurrent first references for the same id observe the same instance.
    pub fn get_or_create(&self, id: &ConversationId) -> Arc<ConversationHistory> {
        if let Some(history) = self.histories.get(id) {
            return Arc::clone(history.value());
        }
        let history = self
            .histories
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(conversation_id = %id, "creating conversation history");
                Arc::new(ConversationHistory::new(id.clone(), self.journal.clone()))
            });
        Arc::clone(history.value())
    }

    pub async fn append(&self, id: &ConversationId, message: Message) -> Result<(), ConfabError> {
        self.get_or_create(id).append(message).await
    }

    /// Appends a user message and its assistant reply adjacently.
    pub async fn append_turn(
        &self,
        id: &ConversationId,
        user: Message,
        assistant: Message,
    ) -> Result<(), ConfabError> {
        self.get_or_create(id).extend(vec![user, assistant]).await
    }

    /// Returns the history for `id` without creating one.
    ///
    /// An id that is not held yet is only adopted when the journal has a
    /// file for it.
    pub async fn lookup(&self, id: &ConversationId) -> Option<Arc<ConversationHistory>> {
        let held = self.histories.get(id).map(|entry| Arc::clone(entry.value()));
        if held.is_some() {
            return held;
        }
        let journal = self.journal.as_ref()?;
        if journal.contains(id).await {
            Some(self.get_or_create(id))
        } else {
            None
        }
    }

    /// Every message of `id`; empty for an unknown id.
    pub async fn get_messages(&self, id: &ConversationId) -> Vec<Message> {
        match self.lookup(id).await {
            Some(history) => history.snapshot().await,
            None => Vec::new(),
        }
    }

    /// The last `window` messages, oldest first.
    pub async fn recent(&self, id: &ConversationId, window: usize) -> Vec<Message> {
        match self.lookup(id).await {
            Some(history) => history.recent(window).await,
            None => Vec::new(),
        }
    }

    /// Ids currently held, sorted.
    pub fn conversation_ids(&self) -> Vec<ConversationId> {
        let mut ids: Vec<_> = self.histories.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Number of histories held.
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    pub fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }
}
