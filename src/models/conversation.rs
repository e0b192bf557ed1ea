use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat thread, scoped to the visitor session that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub session_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape for the history panel. Leaves out `session_id` so the
/// scoping value is never echoed back to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
