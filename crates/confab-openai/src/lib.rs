// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible agent runner for Confab.
//!
//! Builds a Chat Completions request from the turn context (system prompt,
//! recent history, user input) and streams the response as fragments. Works
//! with any endpoint that speaks the streaming Chat Completions protocol.

pub mod client;
pub mod sse;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use confab_config::model::ProviderConfig;
use confab_core::types::{AgentContext, FragmentStream, Role};
use confab_core::{AgentRunner, ConfabError};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::ChatClient;
use crate::types::{ChatMessage, ChatRequest, StreamOptions};

/// Streams turns from an OpenAI-compatible endpoint.
///
/// Missing credentials are reported per invocation as
/// [`ConfabError::SourceBuild`], so a server can start before a key is set.
#[derive(Debug, Clone)]
pub struct OpenAiRunner {
    config: ProviderConfig,
    client: Option<ChatClient>,
}

impl OpenAiRunner {
    pub fn new(config: ProviderConfig) -> Result<Self, ConfabError> {
        let client = match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Some(ChatClient::new(
                &config.base_url,
                key,
                Duration::from_secs(config.request_timeout_secs),
            )?),
            _ => None,
        };
        Ok(Self { config, client })
    }

    /// Replaces the HTTP client (tests).
    pub fn with_client(mut self, client: ChatClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Builds the request body for one turn.
    pub fn build_request(&self, context: &AgentContext) -> ChatRequest {
        let mut messages = Vec::with_capacity(context.history.len() + 2);
        if let Some(prompt) = context.system_prompt.as_deref().filter(|p| !p.is_empty()) {
            messages.push(ChatMessage {
                role: Role::System.to_string(),
                content: prompt.to_string(),
            });
        }
        messages.extend(context.history.iter().map(|m| ChatMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));
        messages.push(ChatMessage {
            role: Role::User.to_string(),
            content: context.input.clone(),
        });

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            stream: true,
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
        }
    }
}

#[async_trait]
impl AgentRunner for OpenAiRunner {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn invoke(
        &self,
        context: AgentContext,
        cancel: CancellationToken,
    ) -> Result<FragmentStream, ConfabError> {
        let Some(client) = &self.client else {
            return Err(ConfabError::SourceBuild {
                message: "provider.api_key is not set".into(),
                source: None,
            });
        };
        if self.config.model.trim().is_empty() {
            return Err(ConfabError::SourceBuild {
                message: "provider.model is not set".into(),
                source: None,
            });
        }

        let request = self.build_request(&context);
        debug!(
            conversation_id = %context.conversation_id,
            model = %request.model,
            messages = request.messages.len(),
            "starting chat stream"
        );

        let stream = tokio::select! {
            result = client.stream_chat(&request) => result?,
            () = cancel.cancelled() => return Err(ConfabError::Cancelled),
        };
        Ok(Box::pin(stream.take_until(cancel.cancelled_owned())))
    }
}

#[cfg(test)]
mod tests {
    use confab_core::types::{ConversationId, Fragment, Message};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn context() -> AgentContext {
        AgentContext {
            conversation_id: ConversationId::from("c"),
            input: "what now?".into(),
            system_prompt: Some("be brief".into()),
            history: vec![Message::user("earlier"), Message::assistant("reply")],
        }
    }

    fn config(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            base_url: base_url.to_string(),
            api_key: Some("sk-test".into()),
            model: "ep-test".into(),
            request_timeout_secs: 5,
        }
    }

    fn sse_body(parts: &[&str]) -> String {
        parts.iter().map(|p| format!("data: {p}\n\n")).collect()
    }

    #[test]
    fn request_orders_system_history_input() {
        let runner = OpenAiRunner::new(config("http://localhost:1")).unwrap();
        let request = runner.build_request(&context());
        let roles: Vec<_> = request.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(request.messages[3].content, "what now?");
        assert!(request.stream);
    }

    #[tokio::test]
    async fn missing_key_is_build_error() {
        let mut cfg = config("http://localhost:1");
        cfg.api_key = None;
        let runner = OpenAiRunner::new(cfg).unwrap();
        let err = runner
            .invoke(context(), CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("api_key"));
    }

    #[tokio::test]
    async fn streams_fragments_from_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "ep-test", "stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[
                        r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
                        r#"{"choices":[{"delta":{"content":"lo"}}]}"#,
                        "[DONE]",
                    ])),
            )
            .mount(&server)
            .await;

        let runner = OpenAiRunner::new(config(&format!("{}/v1", server.uri()))).unwrap();
        let fragments: Vec<_> = runner
            .invoke(context(), CancellationToken::new())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(
            fragments,
            vec![Ok(Fragment::text("Hel")), Ok(Fragment::text("lo"))]
        );
    }

    #[tokio::test]
    async fn auth_failure_is_build_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#,
            ))
            .mount(&server)
            .await;

        let runner = OpenAiRunner::new(config(&server.uri())).unwrap();
        let err = runner
            .invoke(context(), CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ConfabError::SourceBuild { .. }));
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn transient_error_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[
                        r#"{"choices":[{"delta":{"content":"ok"}}]}"#,
                        "[DONE]",
                    ])),
            )
            .mount(&server)
            .await;

        let cfg = config(&server.uri());
        let client = ChatClient::new(&cfg.base_url, "sk-test", Duration::from_secs(5))
            .unwrap()
            .with_retry_delay(Duration::from_millis(10));
        let runner = OpenAiRunner::new(cfg).unwrap().with_client(client);
        let fragments: Vec<_> = runner
            .invoke(context(), CancellationToken::new())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(fragments, vec![Ok(Fragment::text("ok"))]);
    }
}
