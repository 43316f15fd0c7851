// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response stream fan-out for Confab.
//!
//! One fragment source is split by [`tee`] into a live branch for the caller
//! and a background branch that a [`ReassemblyTask`] drains, merges into one
//! assistant message and hands to a [`TurnCommitter`](confab_core::TurnCommitter).

pub mod duplicator;
pub mod merge;
pub mod reassembler;

pub use duplicator::{tee, Branch, StreamHandle};
pub use merge::{concat_fragments, MessageAssembler};
pub use reassembler::{Phase, ReassemblyHandle, ReassemblyTask};
