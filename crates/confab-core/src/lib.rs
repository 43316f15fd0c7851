// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Confab.
//!
//! Defines the conversation data model, the error taxonomy shared by the
//! stream, memory and agent crates, and the collaborator traits that the
//! runtime is wired from: an [`AgentRunner`] that produces fragments and a
//! [`StreamObserver`] that receives background-branch failures.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ConfabError, MergeError, StreamError};
pub use types::{
    AgentContext, CommitReport, ConversationId, Fragment, FragmentStream, Message, Role,
    TerminalState,
};

pub use traits::{AgentRunner, StreamObserver, TracingObserver, TurnCommitter};
