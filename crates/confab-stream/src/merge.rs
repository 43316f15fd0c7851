// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fragment merge rule.
//!
//! Text deltas concatenate in order. Tool-call deltas combine by index, with
//! argument text concatenating and id/name fixed by the first fragment that
//! carries them. Role and finish reason are set once. Usage is cumulative on
//! the provider side, so the last report wins.

use std::collections::BTreeMap;

use confab_core::types::{
    Fragment, Message, MessageMetadata, Role, TokenUsage, ToolCall, ToolCallDelta,
};
use confab_core::MergeError;

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Incrementally merges fragments into one message.
///
/// Conflicting fields are recorded and the conflicting value is ignored, so
/// the remainder of the message is always assembled.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    role: Option<Role>,
    content: String,
    tool_calls: BTreeMap<u32, PartialToolCall>,
    finish_reason: Option<String>,
    usage: Option<TokenUsage>,
    fragments: usize,
    errors: Vec<MergeError>,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fragments pushed so far.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Text accumulated so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Conflicts recorded so far.
    pub fn errors(&self) -> &[MergeError] {
        &self.errors
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.fragments += 1;

        if let Some(role) = fragment.role {
            match self.role {
                None => self.role = Some(role),
                Some(expected) if expected != role => self.errors.push(MergeError::RoleConflict {
                    expected,
                    found: role,
                }),
                Some(_) => {}
            }
        }

        self.content.push_str(&fragment.content);

        for delta in fragment.tool_calls {
            self.push_tool_call(delta);
        }

        if let Some(reason) = fragment.finish_reason.filter(|r| !r.is_empty()) {
            match &self.finish_reason {
                None => self.finish_reason = Some(reason),
                Some(expected) if *expected != reason => {
                    self.errors.push(MergeError::FinishReasonConflict {
                        expected: expected.clone(),
                        found: reason,
                    })
                }
                Some(_) => {}
            }
        }

        if fragment.usage.is_some() {
            self.usage = fragment.usage;
        }
    }

    fn push_tool_call(&mut self, delta: ToolCallDelta) {
        let index = delta.index;
        let call = self.tool_calls.entry(index).or_default();

        if let Some(found) = delta.id.filter(|id| !id.is_empty()) {
            match &call.id {
                None => call.id = Some(found),
                Some(expected) if *expected != found => {
                    self.errors.push(MergeError::ToolCallIdConflict {
                        index,
                        expected: expected.clone(),
                        found,
                    })
                }
                Some(_) => {}
            }
        }

        if let Some(found) = delta.name.filter(|name| !name.is_empty()) {
            match &call.name {
                None => call.name = Some(found),
                Some(expected) if *expected != found => {
                    self.errors.push(MergeError::ToolCallNameConflict {
                        index,
                        expected: expected.clone(),
                        found,
                    })
                }
                Some(_) => {}
            }
        }

        call.arguments.push_str(&delta.arguments);
    }

    /// Builds the message together with every conflict encountered.
    pub fn finish(self) -> (Message, Vec<MergeError>) {
        let mut message = Message::new(self.role.unwrap_or(Role::Assistant), self.content);
        message.tool_calls = self
            .tool_calls
            .into_values()
            .map(|call| ToolCall {
                id: call.id.unwrap_or_default(),
                name: call.name.unwrap_or_default(),
                arguments: call.arguments,
            })
            .collect();
        message.metadata = MessageMetadata {
            finish_reason: self.finish_reason,
            usage: self.usage,
            ..message.metadata
        };
        (message, self.errors)
    }
}

/// Strict merge: fails on the first conflict.
pub fn concat_fragments<I>(fragments: I) -> Result<Message, MergeError>
where
    I: IntoIterator<Item = Fragment>,
{
    let mut assembler = MessageAssembler::new();
    for fragment in fragments {
        assembler.push(fragment);
        if let Some(error) = assembler.errors.first() {
            return Err(error.clone());
        }
    }
    Ok(assembler.finish().0)
}
