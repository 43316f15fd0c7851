// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation types shared across the Confab workspace.

use std::fmt;
use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{MergeError, StreamError};

/// Opaque key identifying one conversation's history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Author of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Token usage reported by the model provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// How the stream that produced an assistant message ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TerminalState {
    /// End-of-stream was observed.
    Completed,
    /// The governing context was cancelled first.
    Cancelled,
    /// The source failed mid-stream.
    Failed,
}

/// A fully assembled tool call on an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON argument text as streamed by the provider.
    pub arguments: String,
}

/// Optional structured metadata carried by a [`Message`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Set on assistant messages assembled from a stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_state: Option<TerminalState>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// One entry in a conversation history. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            metadata: MessageMetadata {
                created_at: chrono::Utc::now().to_rfc3339(),
                ..Default::default()
            },
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Incremental piece of a tool call, keyed by its position in the response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: String,
}

/// An ordered increment of assistant output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl Fragment {
    /// A fragment carrying only a text delta.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Ordered fragment sequence produced by one agent invocation.
///
/// The stream ends (`None`) on end-of-stream; an `Err` item is a terminal
/// failure and no further items follow it.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, StreamError>> + Send>>;

/// Everything an [`AgentRunner`](crate::AgentRunner) needs for one turn.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub conversation_id: ConversationId,
    pub input: String,
    pub system_prompt: Option<String>,
    /// Recent history replayed to the model, oldest first.
    pub history: Vec<Message>,
}

/// Terminal result of one background reassembly.
#[derive(Debug, Clone)]
pub struct CommitReport {
    pub conversation_id: ConversationId,
    pub state: TerminalState,
    /// Number of fragments drained before the terminal state.
    pub fragments: usize,
    /// The assistant message that was appended.
    pub assistant: Message,
    pub merge_errors: Vec<MergeError>,
    pub stream_error: Option<StreamError>,
    /// False when the commit could not be made durable.
    pub persisted: bool,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn role_round_trips_lowercase() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::from_str("user").unwrap(), Role::User);
        let json = serde_json::to_string(&Role::System).unwrap();
        assert_eq!(json, "\"system\"");
    }

    #[test]
    fn message_constructor_stamps_rfc3339() {
        let msg = Message::user("hi");
        assert_eq!(msg.role, Role::User);
        assert!(chrono::DateTime::parse_from_rfc3339(&msg.metadata.created_at).is_ok());
        assert!(msg.metadata.terminal_state.is_none());
    }

    #[test]
    fn message_json_omits_empty_optionals() {
        let msg = Message::assistant("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert!(json["metadata"].get("usage").is_none());
        assert_eq!(json["content"], "hello");
    }

    #[test]
    fn message_tolerates_missing_metadata() {
        let msg: Message = serde_json::from_str(r#"{"role":"user","content":"x"}"#).unwrap();
        assert_eq!(msg.metadata, MessageMetadata::default());
    }

    #[test]
    fn conversation_id_serializes_as_plain_string() {
        let id = ConversationId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert_eq!(id.to_string(), "abc");
    }
}
