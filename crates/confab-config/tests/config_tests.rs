// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the configuration system.

use confab_config::diagnostic::ConfigError;
use confab_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_document_deserializes() {
    let toml = r#"
[agent]
name = "meeting-bot"
log_level = "debug"
system_prompt = "You are helpful."
history_window = 10

[provider]
base_url = "http://localhost:9000/v1"
api_key = "sk-test"
model = "ep-123"
request_timeout_secs = 30

[memory]
journal_dir = "/tmp/confab"

[stream]
branch_buffer = 4
shutdown_grace_secs = 2

[gateway]
host = "0.0.0.0"
port = 9090
bearer_token = "tok"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "meeting-bot");
    assert_eq!(config.agent.history_window, 10);
    assert_eq!(config.agent.system_prompt.as_deref(), Some("You are helpful."));
    assert_eq!(config.provider.model, "ep-123");
    assert_eq!(config.provider.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.memory.journal_dir.as_deref(), Some("/tmp/confab"));
    assert_eq!(config.stream.branch_buffer, 4);
    assert_eq!(config.gateway.port, 9090);
    assert_eq!(config.gateway.bearer_token.as_deref(), Some("tok"));
}

#[test]
fn empty_document_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.stream.branch_buffer, 64);
}

#[test]
fn unknown_key_yields_suggestion() {
    let errors = load_and_validate_str(
        r#"
[stream]
brnch_buffer = 3
"#,
    )
    .unwrap_err();

    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "brnch_buffer");
            assert_eq!(suggestion.as_deref(), Some("branch_buffer"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n").unwrap_err();
    assert!(
        matches!(&errors[0], ConfigError::InvalidType { key, .. } if key == "gateway.port"),
        "got {:?}",
        errors[0]
    );
}

#[test]
fn semantic_validation_runs_after_parse() {
    let errors = load_and_validate_str("[stream]\nbranch_buffer = 0\n").unwrap_err();
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}
