// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE parsing for streaming Chat Completions responses.
//!
//! Every `data:` line carries a JSON [`StreamChunk`] until the literal
//! `[DONE]`, which ends the stream.

use std::pin::Pin;

use confab_core::types::{Fragment, Role, TokenUsage, ToolCallDelta};
use confab_core::StreamError;
use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::{Stream, StreamExt};

use crate::types::StreamChunk;

const DONE_SENTINEL: &str = "[DONE]";

enum SseItem {
    Chunk(StreamChunk),
    Done,
}

/// Parses a streaming response body into fragments.
///
/// Chunks that carry nothing (keep-alives, empty deltas) are skipped.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<Fragment, StreamError>> + Send>> {
    let items = response
        .bytes_stream()
        .eventsource()
        .filter_map(|event| {
            future::ready(match event {
                Ok(event) if event.data.trim() == DONE_SENTINEL => Some(Ok(SseItem::Done)),
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => Some(
                    serde_json::from_str::<StreamChunk>(&event.data)
                        .map(SseItem::Chunk)
                        .map_err(|e| StreamError::read(format!("malformed stream chunk: {e}"))),
                ),
                Err(e) => Some(Err(StreamError::read(format!("SSE stream error: {e}")))),
            })
        });

    let fragments = items
        .take_while(|item| future::ready(!matches!(item, Ok(SseItem::Done))))
        .filter_map(|item| {
            future::ready(match item {
                Ok(SseItem::Chunk(chunk)) => {
                    let fragment = chunk_to_fragment(chunk);
                    (fragment != Fragment::default()).then_some(Ok(fragment))
                }
                Ok(SseItem::Done) => None,
                Err(e) => Some(Err(e)),
            })
        });

    // A failure is terminal.
    let mut failed = false;
    let fused = fragments.take_while(move |item| {
        let keep = !failed;
        failed |= item.is_err();
        future::ready(keep)
    });

    Box::pin(fused)
}

/// Maps one chunk onto the fragment model.
pub fn chunk_to_fragment(chunk: StreamChunk) -> Fragment {
    let usage = chunk.usage.map(|u| TokenUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Fragment {
            usage,
            ..Default::default()
        };
    };

    Fragment {
        role: choice.delta.role.as_deref().and_then(|r| r.parse::<Role>().ok()),
        content: choice.delta.content.unwrap_or_default(),
        tool_calls: choice
            .delta
            .tool_calls
            .into_iter()
            .map(|call| {
                let function = call.function.unwrap_or_default();
                ToolCallDelta {
                    index: call.index,
                    id: call.id,
                    name: function.name,
                    arguments: function.arguments.unwrap_or_default(),
                }
            })
            .collect(),
        finish_reason: choice.finish_reason,
        usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    fn data(json: &str) -> String {
        format!("data: {json}\n\n")
    }

    #[tokio::test]
    async fn text_deltas_until_done() {
        let body = [
            data(r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#),
            data(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#),
            data(r#"{"choices":[{"delta":{"content":"lo"},"finish_reason":"stop"}]}"#),
            data("[DONE]"),
            data(r#"{"choices":[{"delta":{"content":"ignored"}}]}"#),
        ]
        .concat();

        let fragments: Vec<_> = parse_sse_stream(mock_sse_response(&body).await)
            .collect()
            .await;
        assert_eq!(fragments.len(), 3);
        let first = fragments[0].as_ref().unwrap();
        assert_eq!(first.role, Some(Role::Assistant));
        assert_eq!(fragments[1].as_ref().unwrap().content, "Hel");
        assert_eq!(
            fragments[2].as_ref().unwrap().finish_reason.as_deref(),
            Some("stop")
        );
    }

    #[tokio::test]
    async fn malformed_chunk_is_terminal_error() {
        let body = [
            data(r#"{"choices":[{"delta":{"content":"a"}}]}"#),
            data("{broken"),
            data(r#"{"choices":[{"delta":{"content":"b"}}]}"#),
        ]
        .concat();

        let items: Vec<_> = parse_sse_stream(mock_sse_response(&body).await)
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Err(StreamError::Read { message }) if message.contains("malformed")));
    }

    #[test]
    fn usage_only_chunk_maps_to_usage_fragment() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":4}}"#)
                .unwrap();
        let fragment = chunk_to_fragment(chunk);
        assert_eq!(
            fragment.usage,
            Some(TokenUsage {
                input_tokens: 3,
                output_tokens: 4
            })
        );
        assert!(fragment.content.is_empty());
    }
}
