use serde::{Deserialize, Serialize};

use crate::models::ChatTurn;

/// Request body for `POST {base}/chat/completions`.
#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&ChatTurn> for WireMessage {
    fn from(turn: &ChatTurn) -> Self {
        WireMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// One `data:` payload of the streamed response. Chunks without a
/// content delta (role announcements, finish markers, usage reports)
/// deserialize cleanly and simply carry nothing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl CompletionChunk {
    /// Chunk carrying a single content delta, used when re-emitting the
    /// stream to the browser.
    pub fn from_content(content: &str) -> Self {
        CompletionChunk {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    content: Some(content.to_string()),
                },
            }],
        }
    }

    /// Typed lookup of `choices[0].delta.content`. A missing or empty
    /// delta is a normal no-op chunk, not an error.
    pub fn delta_content(&self) -> Option<&str> {
        self.choices
            .first()?
            .delta
            .content
            .as_deref()
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpstreamErrorResponse {
    pub error: UpstreamErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamErrorDetail {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice_delta() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"こんにちは"}}]}"#).unwrap();
        assert_eq!(chunk.delta_content(), Some("こんにちは"));
    }

    #[test]
    fn tolerates_chunks_without_content() {
        let role_only: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(role_only.delta_content(), None);

        let finish: CompletionChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":null}"#,
        )
        .unwrap();
        assert_eq!(finish.delta_content(), None);

        let empty_choices: CompletionChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(empty_choices.delta_content(), None);
    }

    #[test]
    fn relay_chunk_serializes_like_the_upstream_shape() {
        let json = serde_json::to_string(&CompletionChunk::from_content("abc")).unwrap();
        assert_eq!(json, r#"{"choices":[{"delta":{"content":"abc"}}]}"#);
    }
}
