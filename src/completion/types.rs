use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::ChatTurn;

#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited by the completion API")]
    RateLimited,

    #[error("{0}")]
    RequestFailed(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Incremental output of one streamed completion turn.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(String),
    Done,
    Error(String),
}

/// Streaming chat-completion backend. The production implementation
/// talks to an OpenAI-compatible endpoint; tests install scripted
/// stand-ins.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Stream a reply to the given transcript, emitting events on `tx`
    /// until the turn ends. Errors raised before any token is produced
    /// come back as `Err`; mid-stream failures arrive as
    /// [`StreamEvent::Error`].
    async fn stream_chat(
        &self,
        turns: &[ChatTurn],
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), CompletionError>;
}
