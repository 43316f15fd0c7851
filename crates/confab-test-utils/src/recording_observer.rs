// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream observer that records every event for assertions.

use std::sync::Mutex;

use confab_core::types::{CommitReport, ConversationId};
use confab_core::{ConfabError, MergeError, StreamError, StreamObserver};

#[derive(Debug, Default)]
pub struct RecordingObserver {
    stream_errors: Mutex<Vec<(ConversationId, StreamError)>>,
    merge_errors: Mutex<Vec<(ConversationId, MergeError)>>,
    commit_failures: Mutex<Vec<(ConversationId, String)>>,
    commits: Mutex<Vec<CommitReport>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stream_errors(&self) -> Vec<(ConversationId, StreamError)> {
        self.stream_errors.lock().unwrap().clone()
    }

    pub fn merge_errors(&self) -> Vec<(ConversationId, MergeError)> {
        self.merge_errors.lock().unwrap().clone()
    }

    /// Commit failures, rendered with `Display`.
    pub fn commit_failures(&self) -> Vec<(ConversationId, String)> {
        self.commit_failures.lock().unwrap().clone()
    }

    pub fn commits(&self) -> Vec<CommitReport> {
        self.commits.lock().unwrap().clone()
    }
}

impl StreamObserver for RecordingObserver {
    fn stream_error(&self, conversation_id: &ConversationId, error: &StreamError) {
        self.stream_errors
            .lock()
            .unwrap()
            .push((conversation_id.clone(), error.clone()));
    }

    fn merge_error(&self, conversation_id: &ConversationId, error: &MergeError) {
        self.merge_errors
            .lock()
            .unwrap()
            .push((conversation_id.clone(), error.clone()));
    }

    fn commit_failed(&self, conversation_id: &ConversationId, error: &ConfabError) {
        self.commit_failures
            .lock()
            .unwrap()
            .push((conversation_id.clone(), error.to_string()));
    }

    fn committed(&self, report: &CommitReport) {
        self.commits.lock().unwrap().push(report.clone());
    }
}
