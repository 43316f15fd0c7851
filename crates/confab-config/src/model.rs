// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so a misspelled key is a
//! startup error instead of a silently ignored setting.

use serde::{Deserialize, Serialize};

/// Top-level Confab configuration. All sections are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfabConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    /// OpenAI-compatible model endpoint.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Conversation store settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Stream fan-out settings.
    #[serde(default)]
    pub stream: StreamConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Agent identity and prompt configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Number of most recent history messages replayed to the model.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
            history_window: default_history_window(),
        }
    }
}

fn default_agent_name() -> String {
    "confab".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_history_window() -> usize {
    6
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key. Usually supplied through `CONFAB_PROVIDER_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model or endpoint id.
    #[serde(default)]
    pub model: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://ark.cn-beijing.volces.com/api/v3".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Conversation store configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Directory for per-conversation JSONL journals. In-memory only when unset.
    #[serde(default)]
    pub journal_dir: Option<String>,
}

/// Stream duplication and shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    /// Fragments buffered per branch before the producer is suspended.
    #[serde(default = "default_branch_buffer")]
    pub branch_buffer: usize,

    /// How long shutdown waits for in-flight commits.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            branch_buffer: default_branch_buffer(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_branch_buffer() -> usize {
    64
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/chat` and `/v1/*` when set.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ConfabConfig::default();
        assert_eq!(config.agent.name, "confab");
        assert_eq!(config.agent.history_window, 6);
        assert_eq!(config.stream.branch_buffer, 64);
        assert_eq!(config.gateway.port, 8080);
        assert!(config.memory.journal_dir.is_none());
        assert!(config.provider.api_key.is_none());
    }

    #[test]
    fn default_serializes_to_toml() {
        let rendered = toml::to_string(&ConfabConfig::default()).unwrap();
        assert!(rendered.contains("[stream]"));
        assert!(rendered.contains("branch_buffer = 64"));
    }
}
