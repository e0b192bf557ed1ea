use std::convert::Infallible;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::completion::wire::CompletionChunk;
use crate::error::ApiError;
use crate::models::{ChatTurn, Role};
use crate::services::chat::TurnEvent;
use crate::state::AppState;

pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatPayload {
    pub messages: Vec<ChatTurn>,
    pub session_id: Option<String>,
    pub conversation_id: Option<String>,
}

/// Relay one chat turn upstream, re-emitting it as `data:` frames. With
/// a `session_id` the turn is persisted and the response carries the
/// conversation id in a header; without one the relay is stateless.
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ChatPayload>,
) -> Result<Response, ApiError> {
    check_publishable_key(&headers, &state.config.publishable_key)?;

    if payload.messages.is_empty() {
        return Err(ApiError::Validation("Invalid messages"));
    }

    let mut conversation_id = None;
    if let Some(session_id) = payload.session_id.as_deref() {
        validate_session_id(session_id)?;

        let last = payload
            .messages
            .last()
            .filter(|turn| turn.role == Role::User)
            .ok_or(ApiError::Validation("Invalid messages"))?;

        let conversation = state
            .chat
            .ensure_conversation(session_id, payload.conversation_id.as_deref(), &last.content)
            .await?
            .ok_or(ApiError::NotFound)?;
        state.chat.record_user_turn(&conversation.id, &last.content).await?;
        conversation_id = Some(conversation.id);
    }

    let (tx, rx) = mpsc::channel::<TurnEvent>(64);
    let service = state.chat.clone();
    let turns = payload.messages;
    let persist_into = conversation_id.clone();
    tokio::spawn(async move {
        service.run_turn(turns, persist_into, tx).await;
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = match event {
            TurnEvent::Delta(content) => serde_json::to_string(&CompletionChunk::from_content(&content))
                .unwrap_or_else(|_| "{}".to_string()),
            TurnEvent::Done => "[DONE]".to_string(),
        };
        Ok::<Event, Infallible>(Event::default().data(data))
    });

    let mut response = Sse::new(stream).into_response();
    if let Some(id) = conversation_id {
        if let Ok(value) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(CONVERSATION_ID_HEADER, value);
        }
    }
    Ok(response)
}

fn check_publishable_key(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(t) if t == expected => Ok(()),
        _ => Err(ApiError::BadKey),
    }
}

pub(crate) fn validate_session_id(session_id: &str) -> Result<(), ApiError> {
    if session_id.is_empty() || session_id.chars().count() > 128 {
        return Err(ApiError::Validation("Invalid session id"));
    }
    Ok(())
}
