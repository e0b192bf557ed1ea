use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::models::{ChatMessage, ConversationSummary};
use crate::services::conversations;
use crate::state::AppState;

use super::chat::validate_session_id;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

fn require_session(query: &SessionQuery) -> Result<&str, ApiError> {
    let session_id = query
        .session_id
        .as_deref()
        .ok_or(ApiError::Validation("Invalid session id"))?;
    validate_session_id(session_id)?;
    Ok(session_id)
}

/// Recent conversations of one session, newest activity first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let session_id = require_session(&query)?;
    let conversations = conversations::list_for_session(&state.db, session_id).await?;
    Ok(Json(conversations))
}

/// Full transcript of one conversation, oldest first. Conversations
/// outside the session are indistinguishable from missing ones.
pub async fn messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let session_id = require_session(&query)?;
    let messages = conversations::messages_for_session(&state.db, &id, session_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(messages))
}

/// Idempotent delete within the session scope.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
    let session_id = require_session(&query)?;
    let deleted = conversations::delete_for_session(&state.db, &id, session_id).await?;
    if !deleted {
        tracing::debug!("Delete matched no conversation");
    }
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::completion::types::testing::ScriptedBackend;
    use crate::mail::testing::RecordingMailer;
    use crate::models::{Conversation, Role};

    async fn state() -> AppState {
        AppState::for_tests(
            Arc::new(RecordingMailer::new()),
            Arc::new(ScriptedBackend::replying(vec![])),
        )
        .await
    }

    fn session(id: &str) -> Query<SessionQuery> {
        Query(SessionQuery {
            session_id: Some(id.to_string()),
        })
    }

    async fn seed_conversation(state: &AppState, session_id: &str) -> Conversation {
        let now = Utc::now();
        let conv = Conversation {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            title: "会話".to_string(),
            created_at: now,
            updated_at: now,
        };
        state.db.insert_conversation(&conv).await.unwrap();
        state
            .db
            .insert_message(&crate::models::ChatMessage {
                id: Uuid::new_v4().to_string(),
                conversation_id: conv.id.clone(),
                role: Role::User,
                content: "こんにちは".to_string(),
                created_at: now,
            })
            .await
            .unwrap();
        conv
    }

    #[tokio::test]
    async fn listing_requires_a_session_id() {
        let state = state().await;
        let result = list(State(state), Query(SessionQuery::default())).await;
        assert!(matches!(
            result.unwrap_err(),
            ApiError::Validation("Invalid session id")
        ));
    }

    #[tokio::test]
    async fn transcripts_stay_inside_their_session() {
        let state = state().await;
        let conv = seed_conversation(&state, "session-a").await;

        let Json(transcript) = messages(
            State(state.clone()),
            Path(conv.id.clone()),
            session("session-a"),
        )
        .await
        .unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, "こんにちは");

        let result = messages(
            State(state.clone()),
            Path(conv.id.clone()),
            session("session-b"),
        )
        .await;
        assert!(matches!(result.unwrap_err(), ApiError::NotFound));
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_scoped() {
        let state = state().await;
        let conv = seed_conversation(&state, "session-a").await;

        // foreign session deletes nothing but still succeeds
        let result = delete(
            State(state.clone()),
            Path(conv.id.clone()),
            session("session-b"),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(state.db.list_conversations("session-a", 20).await.unwrap().len(), 1);

        let result = delete(
            State(state.clone()),
            Path(conv.id.clone()),
            session("session-a"),
        )
        .await;
        assert!(result.is_ok());
        assert!(state.db.list_conversations("session-a", 20).await.unwrap().is_empty());
    }
}
