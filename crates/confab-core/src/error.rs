// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Confab.
//!
//! [`ConfabError`] is the crate-crossing error. [`StreamError`] and
//! [`MergeError`] are cloneable because the same value is delivered to both
//! branches of a duplicated stream and recorded in commit reports.

use serde::Serialize;
use thiserror::Error;

use crate::types::Role;

/// The primary error type used across Confab crates.
#[derive(Debug, Error)]
pub enum ConfabError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The fragment source could not be constructed or started.
    ///
    /// Nothing is streamed and nothing is committed when this is returned.
    #[error("failed to build agent runner: {message}")]
    SourceBuild {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The governing context ended before the operation finished.
    #[error("operation cancelled")]
    Cancelled,

    /// Conversation store or journal errors.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// HTTP gateway errors (bind failure, serve failure).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A terminal failure observed while reading a fragment stream.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamError {
    /// The source reported a failure.
    #[error("stream read failed: {message}")]
    Read { message: String },

    /// The stream ended without an end-of-stream or failure signal.
    #[error("stream interrupted before a terminal signal")]
    Interrupted,
}

impl StreamError {
    /// Convenience constructor for [`StreamError::Read`].
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }
}

/// Two fragments carried incompatible values for the same field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeError {
    #[error("role conflict: message started as {expected}, fragment says {found}")]
    RoleConflict { expected: Role, found: Role },

    #[error("tool call {index}: id {found:?} conflicts with {expected:?}")]
    ToolCallIdConflict {
        index: u32,
        expected: String,
        found: String,
    },

    #[error("tool call {index}: name {found:?} conflicts with {expected:?}")]
    ToolCallNameConflict {
        index: u32,
        expected: String,
        found: String,
    },

    #[error("finish reason {found:?} conflicts with {expected:?}")]
    FinishReasonConflict { expected: String, found: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_build_message_is_prefixed() {
        let err = ConfabError::SourceBuild {
            message: "missing api key".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "failed to build agent runner: missing api key");
    }

    #[test]
    fn stream_error_display() {
        assert_eq!(
            StreamError::read("connection reset").to_string(),
            "stream read failed: connection reset"
        );
    }

    #[test]
    fn merge_error_serializes_with_kind_tag() {
        let err = MergeError::RoleConflict {
            expected: Role::Assistant,
            found: Role::User,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "role_conflict");
        assert_eq!(json["expected"], "assistant");
        assert_eq!(json["found"], "user");
    }
}
