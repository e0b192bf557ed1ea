use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;

use super::stream::stream_completion;
use super::types::{CompletionBackend, CompletionError, StreamEvent};
use super::wire::{CompletionRequest, UpstreamErrorResponse, WireMessage};
use crate::models::ChatTurn;

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct CompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        CompletionClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn parse_error_message(status: StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<UpstreamErrorResponse>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error.message);
        }
        format!("HTTP {}: Request failed", status.as_u16())
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn stream_chat(
        &self,
        turns: &[ChatTurn],
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: turns.iter().map(WireMessage::from).collect(),
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CompletionError::Auth("Invalid API key".to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::RequestFailed(Self::parse_error_message(
                status, &body,
            )));
        }

        stream_completion(response, tx).await;

        Ok(())
    }
}
