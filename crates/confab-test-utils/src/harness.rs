// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness that wires a [`ConversationAgent`] to scripted mocks.

use std::sync::Arc;

use confab_agent::{AgentSettings, ConversationAgent};
use confab_core::types::{CommitReport, ConversationId, Fragment};
use confab_core::{ConfabError, StreamError};
use confab_memory::{ConversationStore, Journal};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::recording_observer::RecordingObserver;
use crate::scripted_runner::{Script, ScriptedRunner};

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    scripts: Vec<Script>,
    build_error: Option<String>,
    journal: bool,
    settings: AgentSettings,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            scripts: Vec::new(),
            build_error: None,
            journal: false,
            settings: AgentSettings::default(),
        }
    }

    /// Scripts consumed one per invocation.
    pub fn with_scripts(mut self, scripts: Vec<Script>) -> Self {
        self.scripts = scripts;
        self
    }

    /// Every invocation fails to start with `message`.
    pub fn with_build_error(mut self, message: impl Into<String>) -> Self {
        self.build_error = Some(message.into());
        self
    }

    /// Back the store with a journal in a temp directory.
    pub fn with_journal(mut self) -> Self {
        self.journal = true;
        self
    }

    pub fn with_branch_buffer(mut self, capacity: usize) -> Self {
        self.settings.branch_buffer = capacity;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.settings.history_window = window;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.settings.system_prompt = Some(prompt.into());
        self
    }

    pub async fn build(self) -> Result<TestHarness, ConfabError> {
        let runner = Arc::new(match self.build_error {
            Some(message) => ScriptedRunner::failing(message),
            None => ScriptedRunner::with_scripts(self.scripts),
        });

        let (store, temp_dir) = if self.journal {
            let temp_dir = tempfile::TempDir::new().map_err(|e| ConfabError::Storage {
                source: Box::new(e),
            })?;
            let journal = Journal::open(temp_dir.path()).await?;
            (ConversationStore::with_journal(journal), Some(temp_dir))
        } else {
            (ConversationStore::new(), None)
        };
        let store = Arc::new(store);

        let observer = Arc::new(RecordingObserver::new());
        let agent = Arc::new(
            ConversationAgent::new(runner.clone(), Arc::clone(&store), self.settings)
                .with_observer(observer.clone()),
        );

        Ok(TestHarness {
            runner,
            observer,
            store,
            agent,
            _temp_dir: temp_dir,
        })
    }
}

/// What one driven turn produced.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Every item the live branch yielded.
    pub live: Vec<Result<Fragment, StreamError>>,
    /// Background commit report.
    pub report: CommitReport,
}

impl TurnOutcome {
    /// Concatenated text of the live fragments.
    pub fn live_text(&self) -> String {
        self.live
            .iter()
            .filter_map(|item| item.as_ref().ok())
            .map(|fragment| fragment.content.as_str())
            .collect()
    }
}

/// Agent, store and mocks for one test.
pub struct TestHarness {
    pub runner: Arc<ScriptedRunner>,
    pub observer: Arc<RecordingObserver>,
    pub store: Arc<ConversationStore>,
    pub agent: Arc<ConversationAgent>,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Runs one turn, drains the live branch fully and waits for the commit.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<TurnOutcome, ConfabError> {
        let invocation = self
            .agent
            .run(
                ConversationId::from(conversation_id),
                text,
                CancellationToken::new(),
            )
            .await?;
        let live = invocation.live.collect().await;
        let report = invocation.commit.wait().await?;
        Ok(TurnOutcome { live, report })
    }
}
