// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE rendering of a turn's live branch.

use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{SecondsFormat, Utc};
use confab_agent::LiveStream;
use confab_core::types::Fragment;
use confab_core::StreamError;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::DropGuard;

/// Sender name stamped on every pushed fragment.
pub const AGENT_SENDER: &str = "Agent";

#[derive(Debug, Serialize)]
struct FragmentEnvelope<'a> {
    data: FragmentPayload<'a>,
}

#[derive(Debug, Serialize)]
struct FragmentPayload<'a> {
    message: &'a str,
    timestamp: String,
    sender: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    error: String,
}

struct ChatStreamState {
    live: LiveStream,
    /// Cancels the request token when dropped while still armed.
    guard: Option<DropGuard>,
    finished: bool,
}

impl ChatStreamState {
    /// The live branch reached a terminal signal; a later disconnect must
    /// not cancel the background commit.
    fn disarm(&mut self) {
        if let Some(guard) = self.guard.take() {
            let _token = guard.disarm();
        }
        self.finished = true;
    }
}

/// Builds the SSE response for one turn.
///
/// Fragments carrying text become unnamed events, a stream error becomes an
/// `error` event and end-of-stream a `done` event. If the body is dropped
/// before either terminal event, `guard` cancels the turn's token.
pub fn chat_stream(
    live: LiveStream,
    guard: DropGuard,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let state = ChatStreamState {
        live,
        guard: Some(guard),
        finished: false,
    };

    let events = stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            match state.live.next().await {
                Some(Ok(fragment)) => {
                    if fragment.content.is_empty() {
                        continue;
                    }
                    return Some((fragment_event(&fragment), state));
                }
                Some(Err(err)) => {
                    state.disarm();
                    return Some((error_event(&err), state));
                }
                None => {
                    state.disarm();
                    return Some((Ok(Event::default().event("done").data("[DONE]")), state));
                }
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn fragment_event(fragment: &Fragment) -> Result<Event, axum::Error> {
    Event::default().json_data(FragmentEnvelope {
        data: FragmentPayload {
            message: &fragment.content,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            sender: AGENT_SENDER,
        },
    })
}

fn error_event(err: &StreamError) -> Result<Event, axum::Error> {
    Event::default().event("error").json_data(ErrorPayload {
        error: err.to_string(),
    })
}
