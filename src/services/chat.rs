use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::completion::{CompletionBackend, StreamEvent};
use crate::models::{ChatMessage, ChatTurn, Conversation, Role};
use crate::services::conversations::derive_title;
use crate::services::database::Database;

/// Shown (and persisted) when a turn fails without a usable upstream
/// error message.
pub const STREAM_ERROR_MESSAGE: &str = "エラーが発生しました。もう一度お試しください。";

/// Events relayed to the HTTP response stream for one chat turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Delta(String),
    Done,
}

#[derive(Clone)]
pub struct ChatService {
    db: Database,
    backend: Arc<dyn CompletionBackend>,
}

impl ChatService {
    pub fn new(db: Database, backend: Arc<dyn CompletionBackend>) -> Self {
        ChatService { db, backend }
    }

    /// Resolve the conversation a persisted turn belongs to: verify an
    /// explicit id against the session, or open a new conversation
    /// titled from the first message. `None` means the id is unknown
    /// within this session.
    pub async fn ensure_conversation(
        &self,
        session_id: &str,
        conversation_id: Option<&str>,
        first_message: &str,
    ) -> anyhow::Result<Option<Conversation>> {
        if let Some(id) = conversation_id {
            let found = self.db.get_conversation_for_session(id, session_id).await?;
            if let Some(conv) = &found {
                self.db.touch_conversation(&conv.id).await?;
            }
            return Ok(found);
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            title: derive_title(first_message),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_conversation(&conversation).await?;
        Ok(Some(conversation))
    }

    pub async fn record_user_turn(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> anyhow::Result<()> {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role: Role::User,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.db.insert_message(&message).await
    }

    /// Drive one turn end to end: stream the completion, forward deltas,
    /// and once the stream settles persist the assistant reply (or the
    /// error text standing in for it) into the conversation.
    pub async fn run_turn(
        &self,
        turns: Vec<ChatTurn>,
        conversation_id: Option<String>,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        let (event_tx, mut event_rx) = mpsc::channel::<StreamEvent>(64);

        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            if let Err(e) = backend.stream_chat(&turns, event_tx.clone()).await {
                let _ = event_tx.send(StreamEvent::Error(e.to_string())).await;
            }
        });

        let mut accumulated = String::new();
        let mut errored = false;
        let mut error_text: Option<String> = None;

        loop {
            match event_rx.recv().await {
                Some(StreamEvent::Token(token)) => {
                    accumulated.push_str(&token);
                    if tx.send(TurnEvent::Delta(token)).await.is_err() {
                        // client went away mid-stream; abandon the turn
                        return;
                    }
                }
                Some(StreamEvent::Done) => break,
                Some(StreamEvent::Error(error)) => {
                    tracing::error!("Completion stream failed: {error}");
                    errored = true;
                    error_text = Some(error);
                    break;
                }
                None => break,
            }
        }

        // A stream that ends without any content is an error, not an
        // empty reply.
        if accumulated.is_empty() && !errored {
            errored = true;
        }

        let content = if errored {
            let text = error_text
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| STREAM_ERROR_MESSAGE.to_string());
            let _ = tx.send(TurnEvent::Delta(text.clone())).await;
            text
        } else {
            tracing::info!("Completion turn finished ({} chars)", accumulated.chars().count());
            accumulated
        };

        let _ = tx.send(TurnEvent::Done).await;

        if let Some(conversation_id) = conversation_id {
            let message = ChatMessage {
                id: Uuid::new_v4().to_string(),
                conversation_id: conversation_id.clone(),
                role: Role::Assistant,
                content,
                created_at: Utc::now(),
            };
            if let Err(e) = self.db.insert_message(&message).await {
                tracing::error!("Failed to persist assistant reply: {e:#}");
            } else if let Err(e) = self.db.touch_conversation(&conversation_id).await {
                tracing::error!("Failed to bump conversation timestamp: {e:#}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::types::testing::ScriptedBackend;
    use crate::completion::CompletionError;

    fn turns(content: &str) -> Vec<ChatTurn> {
        vec![ChatTurn {
            role: Role::User,
            content: content.to_string(),
        }]
    }

    async fn drain(service: &ChatService, input: Vec<ChatTurn>, conv: Option<String>) -> Vec<TurnEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        service.run_turn(input, conv, tx).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn streams_tokens_and_persists_the_reply() {
        let db = Database::new_in_memory().unwrap();
        let backend = Arc::new(ScriptedBackend::replying(vec![
            StreamEvent::Token("こん".to_string()),
            StreamEvent::Token("にちは".to_string()),
            StreamEvent::Done,
        ]));
        let service = ChatService::new(db.clone(), backend);

        let conv = service
            .ensure_conversation("session-a", None, "こんにちは")
            .await
            .unwrap()
            .unwrap();
        service.record_user_turn(&conv.id, "こんにちは").await.unwrap();

        let events = drain(&service, turns("こんにちは"), Some(conv.id.clone())).await;
        assert_eq!(
            events,
            vec![
                TurnEvent::Delta("こん".to_string()),
                TurnEvent::Delta("にちは".to_string()),
                TurnEvent::Done,
            ]
        );

        let messages = db.list_messages(&conv.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "こんにちは");
    }

    #[tokio::test]
    async fn upstream_failure_lands_in_the_transcript() {
        let db = Database::new_in_memory().unwrap();
        let backend = Arc::new(ScriptedBackend::failing(CompletionError::RequestFailed(
            "HTTP 500: model overloaded".to_string(),
        )));
        let service = ChatService::new(db.clone(), backend);

        let conv = service
            .ensure_conversation("session-a", None, "質問です")
            .await
            .unwrap()
            .unwrap();

        let events = drain(&service, turns("質問です"), Some(conv.id.clone())).await;
        assert_eq!(
            events,
            vec![
                TurnEvent::Delta("HTTP 500: model overloaded".to_string()),
                TurnEvent::Done,
            ]
        );

        let messages = db.list_messages(&conv.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, "HTTP 500: model overloaded");
    }

    #[tokio::test]
    async fn empty_stream_surfaces_the_generic_error() {
        let db = Database::new_in_memory().unwrap();
        let backend = Arc::new(ScriptedBackend::replying(vec![StreamEvent::Done]));
        let service = ChatService::new(db.clone(), backend);

        let events = drain(&service, turns("何かある?"), None).await;
        assert_eq!(
            events,
            vec![
                TurnEvent::Delta(STREAM_ERROR_MESSAGE.to_string()),
                TurnEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn stateless_turns_write_nothing() {
        let db = Database::new_in_memory().unwrap();
        let backend = Arc::new(ScriptedBackend::replying(vec![
            StreamEvent::Token("ok".to_string()),
            StreamEvent::Done,
        ]));
        let service = ChatService::new(db.clone(), backend);

        let events = drain(&service, turns("hi"), None).await;
        assert_eq!(events.len(), 2);

        let conversations = db.list_conversations("session-a", 20).await.unwrap();
        assert!(conversations.is_empty());
    }

    #[tokio::test]
    async fn long_first_messages_become_truncated_titles() {
        let db = Database::new_in_memory().unwrap();
        let backend = Arc::new(ScriptedBackend::replying(vec![StreamEvent::Done]));
        let service = ChatService::new(db, backend);

        let first = "あ".repeat(60);
        let conv = service
            .ensure_conversation("session-a", None, &first)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.title, format!("{}...", "あ".repeat(50)));
    }

    #[tokio::test]
    async fn explicit_ids_are_verified_against_the_session() {
        let db = Database::new_in_memory().unwrap();
        let backend = Arc::new(ScriptedBackend::replying(vec![StreamEvent::Done]));
        let service = ChatService::new(db, backend);

        let conv = service
            .ensure_conversation("session-a", None, "最初")
            .await
            .unwrap()
            .unwrap();

        let again = service
            .ensure_conversation("session-a", Some(&conv.id), "続き")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.id, conv.id);

        let foreign = service
            .ensure_conversation("session-b", Some(&conv.id), "のぞき見")
            .await
            .unwrap();
        assert!(foreign.is_none());
    }
}
