// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invocation orchestration for Confab.
//!
//! [`ConversationAgent::run`] is the entry point for one user turn:
//! - reads the recent history window as model context
//! - starts the [`AgentRunner`] under the caller's governing token
//! - splits the fragment stream into a live branch and a background branch
//! - spawns the [`ReassemblyTask`] that commits the turn
//!
//! The caller receives an [`Invocation`] with the live stream and the
//! reassembly handle. Shutdown waits for outstanding commits.

pub mod live;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use confab_config::ConfabConfig;
use confab_core::types::{AgentContext, ConversationId};
use confab_core::{AgentRunner, ConfabError, StreamObserver, TracingObserver, TurnCommitter};
use confab_memory::{ConversationStore, MemoryCommitter};
use confab_stream::{tee, ReassemblyHandle, ReassemblyTask};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

pub use live::LiveStream;

/// Per-agent knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub system_prompt: Option<String>,
    pub history_window: usize,
    pub branch_buffer: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&ConfabConfig::default())
    }
}

impl AgentSettings {
    pub fn from_config(config: &ConfabConfig) -> Self {
        Self {
            system_prompt: config.agent.system_prompt.clone(),
            history_window: config.agent.history_window,
            branch_buffer: config.stream.branch_buffer,
        }
    }
}

/// One started turn.
pub struct Invocation {
    /// Fragments for the caller. Ends on end-of-stream, on the first error,
    /// or when the governing token is cancelled.
    pub live: LiveStream,
    /// The background reassembly that commits this turn.
    pub commit: ReassemblyHandle,
}

/// Runs turns against an [`AgentRunner`] and commits them to a store.
pub struct ConversationAgent {
    runner: Arc<dyn AgentRunner>,
    store: Arc<ConversationStore>,
    committer: Arc<dyn TurnCommitter>,
    observer: Arc<dyn StreamObserver>,
    settings: AgentSettings,
    tracker: TaskTracker,
}

impl ConversationAgent {
    pub fn new(
        runner: Arc<dyn AgentRunner>,
        store: Arc<ConversationStore>,
        settings: AgentSettings,
    ) -> Self {
        let committer = Arc::new(MemoryCommitter::new(Arc::clone(&store)));
        info!(runner = runner.name(), "conversation agent initialized");
        Self {
            runner,
            store,
            committer,
            observer: Arc::new(TracingObserver),
            settings,
            tracker: TaskTracker::new(),
        }
    }

    /// Replaces the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the default store-backed committer.
    pub fn with_committer(mut self, committer: Arc<dyn TurnCommitter>) -> Self {
        self.committer = committer;
        self
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Number of reassembly tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Starts one turn for `conversation_id`.
    ///
    /// Fails with [`ConfabError::SourceBuild`] if the runner cannot start; in
    /// that case nothing is committed. `cancel` governs both branches:
    /// cancelling it ends the live stream and makes the background branch
    /// commit what it has drained so far.
    pub async fn run(
        &self,
        conversation_id: ConversationId,
        input: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<Invocation, ConfabError> {
        let input = input.into();
        let history = self
            .store
            .recent(&conversation_id, self.settings.history_window)
            .await;
        debug!(
            conversation_id = %conversation_id,
            history = history.len(),
            "starting invocation"
        );

        let context = AgentContext {
            conversation_id: conversation_id.clone(),
            input: input.clone(),
            system_prompt: self.settings.system_prompt.clone(),
            history,
        };

        let source = self
            .runner
            .invoke(context, cancel.clone())
            .await
            .inspect_err(|err| {
                warn!(conversation_id = %conversation_id, error = %err, "agent runner failed to start");
            })?;

        let (live, background) = tee(source, self.settings.branch_buffer).split();
        let commit = ReassemblyTask::new(
            conversation_id,
            input,
            background,
            cancel.clone(),
            Arc::clone(&self.committer),
            Arc::clone(&self.observer),
        )
        .spawn(&self.tracker);

        Ok(Invocation {
            live: LiveStream::new(live, cancel),
            commit,
        })
    }

    /// Waits up to `grace` for in-flight commits. Returns `true` if
    /// everything drained.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        shutdown::drain_tracker(&self.tracker, grace).await
    }
}

/// Random numeric conversation id, as used when a shell starts without `--id`.
pub fn random_conversation_id() -> ConversationId {
    let value = uuid::Uuid::new_v4().as_u128() % 1_000_000;
    ConversationId(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = ConfabConfig::default();
        config.agent.history_window = 3;
        config.stream.branch_buffer = 9;
        config.agent.system_prompt = Some("be brief".into());
        let settings = AgentSettings::from_config(&config);
        assert_eq!(settings.history_window, 3);
        assert_eq!(settings.branch_buffer, 9);
        assert_eq!(settings.system_prompt.as_deref(), Some("be brief"));
    }

    #[test]
    fn random_ids_are_numeric() {
        let id = random_conversation_id();
        assert!(id.as_str().parse::<u32>().unwrap() < 1_000_000);
    }
}
