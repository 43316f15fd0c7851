// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Confab integration tests.
//!
//! - [`ScriptedRunner`] - agent runner that replays scripted fragment sequences
//! - [`RecordingObserver`] - stream observer that keeps every event
//! - [`TestHarness`] - agent, store and mocks wired together

pub mod harness;
pub mod recording_observer;
pub mod scripted_runner;

pub use harness::{TestHarness, TurnOutcome};
pub use recording_observer::RecordingObserver;
pub use scripted_runner::{Script, ScriptedRunner, Step};
