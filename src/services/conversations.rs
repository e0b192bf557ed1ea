use anyhow::Result;

use crate::models::{ChatMessage, ConversationSummary};
use crate::services::database::Database;

/// How many conversations the history panel shows per session.
pub const HISTORY_LIMIT: usize = 20;

const TITLE_MAX_CHARS: usize = 50;

/// Title for a new conversation: the first message, cut to 50 characters
/// with an ellipsis marker when anything was trimmed.
pub fn derive_title(first_message: &str) -> String {
    match first_message.char_indices().nth(TITLE_MAX_CHARS) {
        Some((boundary, _)) => format!("{}...", &first_message[..boundary]),
        None => first_message.to_string(),
    }
}

pub async fn list_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Vec<ConversationSummary>> {
    db.list_conversations(session_id, HISTORY_LIMIT).await
}

/// Messages of one conversation, oldest first. `None` when the
/// conversation does not exist within the session.
pub async fn messages_for_session(
    db: &Database,
    conversation_id: &str,
    session_id: &str,
) -> Result<Option<Vec<ChatMessage>>> {
    match db
        .get_conversation_for_session(conversation_id, session_id)
        .await?
    {
        Some(_) => Ok(Some(db.list_messages(conversation_id).await?)),
        None => Ok(None),
    }
}

pub async fn delete_for_session(
    db: &Database,
    conversation_id: &str,
    session_id: &str,
) -> Result<bool> {
    db.delete_conversation(conversation_id, session_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_kept_verbatim() {
        assert_eq!(derive_title("料金について"), "料金について");
        assert_eq!(derive_title(""), "");
    }

    #[test]
    fn titles_are_cut_at_fifty_characters() {
        let message = "a".repeat(51);
        assert_eq!(derive_title(&message), format!("{}...", "a".repeat(50)));

        let exactly_fifty = "b".repeat(50);
        assert_eq!(derive_title(&exactly_fifty), exactly_fifty);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let message = "あ".repeat(60);
        let title = derive_title(&message);
        assert_eq!(title, format!("{}...", "あ".repeat(50)));
        assert_eq!(title.chars().count(), 53);
    }

    #[tokio::test]
    async fn missing_conversation_yields_no_messages() {
        let db = Database::new_in_memory().unwrap();
        let found = messages_for_session(&db, "nope", "session-a").await.unwrap();
        assert!(found.is_none());
    }
}
