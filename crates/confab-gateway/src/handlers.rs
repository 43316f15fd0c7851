// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use confab_agent::Invocation;
use confab_core::types::{ConversationId, Message};
use serde::{Deserialize, Serialize};

use crate::server::GatewayState;
use crate::sse;

/// Query string of `GET /chat`.
#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    pub meeting_id: Option<String>,
    pub session_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunErrorResponse {
    pub status: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub conversation_id: ConversationId,
    pub messages: Vec<Message>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn bad_request(error: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// GET /chat
pub async fn get_chat(
    State(state): State<GatewayState>,
    Query(query): Query<ChatQuery>,
) -> Response {
    let (Some(meeting_id), Some(session_id)) =
        (present(query.meeting_id), present(query.session_id))
    else {
        return bad_request("meeting_id and session_id are required");
    };
    let Some(message) = present(query.message) else {
        return bad_request("message is required");
    };

    let conversation_id = ConversationId::new(session_id);
    tracing::info!(%meeting_id, conversation_id = %conversation_id, "chat request");

    let cancel = state.shutdown.child_token();
    match state
        .agent
        .run(conversation_id, message, cancel.clone())
        .await
    {
        Ok(Invocation { live, commit: _ }) => {
            sse::chat_stream(live, cancel.drop_guard()).into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RunErrorResponse {
                status: "error".into(),
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /v1/conversations
pub async fn get_conversations(State(state): State<GatewayState>) -> Json<ConversationListResponse> {
    Json(ConversationListResponse {
        conversations: state.agent.store().conversation_ids(),
    })
}

/// GET /v1/conversations/{id}/messages
pub async fn get_conversation_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Json<MessagesResponse> {
    let conversation_id = ConversationId::new(id);
    let messages = state.agent.store().get_messages(&conversation_id).await;
    Json(MessagesResponse {
        conversation_id,
        messages,
    })
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
