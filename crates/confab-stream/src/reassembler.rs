// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background reassembly of the non-live branch.
//!
//! A [`ReassemblyTask`] drains its branch until end-of-stream, failure, or
//! cancellation of the governing token, then commits the user message and
//! whatever was assembled. The commit happens on every terminal path. The
//! returned [`ReassemblyHandle`] exposes the lifecycle phase and the final
//! [`CommitReport`].

use std::sync::Arc;

use confab_core::types::{CommitReport, ConversationId, Message, TerminalState};
use confab_core::{ConfabError, StreamObserver, TurnCommitter};
use futures::StreamExt;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info_span, Instrument};

use crate::duplicator::Branch;
use crate::merge::MessageAssembler;

/// Lifecycle of one duplicated stream and its reassembler.
///
/// `Created → Draining → {Completed | Cancelled | Failed} → Committed → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Draining,
    Completed,
    Cancelled,
    Failed,
    Committed,
    Closed,
}

impl From<TerminalState> for Phase {
    fn from(state: TerminalState) -> Self {
        match state {
            TerminalState::Completed => Phase::Completed,
            TerminalState::Cancelled => Phase::Cancelled,
            TerminalState::Failed => Phase::Failed,
        }
    }
}

/// Drains one background branch and commits the turn it carries.
pub struct ReassemblyTask {
    conversation_id: ConversationId,
    user_input: String,
    branch: Branch,
    cancel: CancellationToken,
    committer: Arc<dyn TurnCommitter>,
    observer: Arc<dyn StreamObserver>,
}

impl ReassemblyTask {
    pub fn new(
        conversation_id: ConversationId,
        user_input: impl Into<String>,
        branch: Branch,
        cancel: CancellationToken,
        committer: Arc<dyn TurnCommitter>,
        observer: Arc<dyn StreamObserver>,
    ) -> Self {
        Self {
            conversation_id,
            user_input: user_input.into(),
            branch,
            cancel,
            committer,
            observer,
        }
    }

    /// Spawns the task on `tracker` and returns its handle.
    pub fn spawn(self, tracker: &TaskTracker) -> ReassemblyHandle {
        let (phase_tx, phase_rx) = watch::channel(Phase::Created);
        let (drained_tx, drained_rx) = watch::channel(0usize);
        let (report_tx, report_rx) = oneshot::channel();

        let span = info_span!("reassembly", conversation_id = %self.conversation_id);
        tracker.spawn(
            async move {
                let report = self.run(&phase_tx, &drained_tx).await;
                // The handle may have been dropped; the commit already happened.
                let _ = report_tx.send(report);
                phase_tx.send_replace(Phase::Closed);
            }
            .instrument(span),
        );

        ReassemblyHandle {
            phase: phase_rx,
            drained: drained_rx,
            report: report_rx,
        }
    }

    async fn run(
        self,
        phase: &watch::Sender<Phase>,
        drained: &watch::Sender<usize>,
    ) -> CommitReport {
        let Self {
            conversation_id,
            user_input,
            mut branch,
            cancel,
            committer,
            observer,
        } = self;

        phase.send_replace(Phase::Draining);
        let mut assembler = MessageAssembler::new();
        let mut stream_error = None;

        let state = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break TerminalState::Cancelled,
                next = branch.next() => match next {
                    Some(Ok(fragment)) => {
                        assembler.push(fragment);
                        drained.send_replace(assembler.fragments());
                    }
                    Some(Err(error)) => {
                        observer.stream_error(&conversation_id, &error);
                        stream_error = Some(error);
                        break TerminalState::Failed;
                    }
                    None => break TerminalState::Completed,
                },
            }
        };
        branch.close();
        drop(branch);
        phase.send_replace(state.into());
        debug!(state = %state, fragments = assembler.fragments(), "background branch drained");

        let fragments = assembler.fragments();
        let (mut assistant, merge_errors) = assembler.finish();
        assistant.metadata.terminal_state = Some(state);
        for error in &merge_errors {
            observer.merge_error(&conversation_id, error);
        }

        let persisted = match committer
            .commit_turn(&conversation_id, Message::user(user_input), assistant.clone())
            .await
        {
            Ok(()) => true,
            Err(error) => {
                observer.commit_failed(&conversation_id, &error);
                false
            }
        };
        phase.send_replace(Phase::Committed);

        let report = CommitReport {
            conversation_id,
            state,
            fragments,
            assistant,
            merge_errors,
            stream_error,
            persisted,
        };
        observer.committed(&report);
        report
    }
}

/// Observes a spawned [`ReassemblyTask`].
#[derive(Debug)]
pub struct ReassemblyHandle {
    phase: watch::Receiver<Phase>,
    drained: watch::Receiver<usize>,
    report: oneshot::Receiver<CommitReport>,
}

impl ReassemblyHandle {
    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// A receiver that is notified on every phase transition.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    /// Waits until at least `count` fragments have been merged, or the task
    /// has stopped draining.
    pub async fn wait_for_fragments(&mut self, count: usize) {
        let _ = self.drained.wait_for(|drained| *drained >= count).await;
    }

    /// Waits for the terminal report.
    ///
    /// Fails only if the task ended without producing one (it panicked or
    /// the runtime shut down first).
    pub async fn wait(self) -> Result<CommitReport, ConfabError> {
        self.report
            .await
            .map_err(|_| ConfabError::Internal("reassembly task ended without a report".into()))
    }
}
