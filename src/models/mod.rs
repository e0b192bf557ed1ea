pub mod conversation;
pub mod forms;
pub mod message;
pub mod news;

pub use conversation::{Conversation, ConversationSummary};
pub use message::{ChatMessage, ChatTurn, Role};
pub use news::{ArticleDraft, FeedEntry, NewsArticle, NewsTemplate};
