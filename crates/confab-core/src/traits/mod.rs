// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the Confab runtime is assembled from.

pub mod committer;
pub mod observer;
pub mod runner;

pub use committer::TurnCommitter;
pub use observer::{StreamObserver, TracingObserver};
pub use runner::AgentRunner;
