// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Observability hook for background-branch outcomes.
//!
//! Failures on the background branch never reach the caller. They are
//! reported here instead, so a deployment can log, count, or alert on them.

use tracing::{debug, error, warn};

use crate::error::{ConfabError, MergeError, StreamError};
use crate::types::{CommitReport, ConversationId};

/// Receives events the background reassembler and committer absorb.
///
/// All methods default to no-ops so implementors override only what they need.
pub trait StreamObserver: Send + Sync + 'static {
    /// The background branch surfaced a failure other than end-of-stream.
    fn stream_error(&self, _conversation_id: &ConversationId, _error: &StreamError) {}

    /// Fragments could not be merged cleanly; the commit continues.
    fn merge_error(&self, _conversation_id: &ConversationId, _error: &MergeError) {}

    /// The turn could not be made durable.
    fn commit_failed(&self, _conversation_id: &ConversationId, _error: &ConfabError) {}

    /// A turn was committed.
    fn committed(&self, _report: &CommitReport) {}
}

/// Observer that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StreamObserver for TracingObserver {
    fn stream_error(&self, conversation_id: &ConversationId, error: &StreamError) {
        warn!(
            conversation_id = %conversation_id,
            error = %error,
            "background branch failed, committing partial turn"
        );
    }

    fn merge_error(&self, conversation_id: &ConversationId, error: &MergeError) {
        warn!(conversation_id = %conversation_id, error = %error, "fragment merge conflict");
    }

    fn commit_failed(&self, conversation_id: &ConversationId, error: &ConfabError) {
        error!(conversation_id = %conversation_id, error = %error, "turn commit failed");
    }

    fn committed(&self, report: &CommitReport) {
        debug!(
            conversation_id = %report.conversation_id,
            state = %report.state,
            fragments = report.fragments,
            content_len = report.assistant.content.len(),
            "turn committed"
        );
    }
}
