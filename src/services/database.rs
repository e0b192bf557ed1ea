use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;

use crate::models::{
    ChatMessage, Conversation, ConversationSummary, NewsArticle, NewsTemplate, Role,
};

#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Create an in-memory database (used for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );",
        )?;

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE conversations (
                    id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE chat_messages (
                    id TEXT PRIMARY KEY,
                    conversation_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
                );

                CREATE TABLE news_articles (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    excerpt TEXT,
                    category TEXT NOT NULL,
                    image_url TEXT,
                    published_at TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE news_templates (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    title_template TEXT NOT NULL,
                    content_template TEXT NOT NULL,
                    category TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX idx_conversations_session ON conversations(session_id, updated_at DESC);
                CREATE INDEX idx_messages_conversation ON chat_messages(conversation_id, created_at);
                CREATE INDEX idx_articles_published ON news_articles(published_at DESC);
                CREATE INDEX idx_templates_created ON news_templates(created_at DESC);

                INSERT INTO schema_version (version) VALUES (1);",
            )?;
        }

        Ok(())
    }

    // --- Conversation CRUD ---

    pub async fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        let conn = self.conn.clone();
        let conv = conversation.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO conversations (id, session_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    conv.id,
                    conv.session_id,
                    conv.title,
                    conv.created_at.to_rfc3339(),
                    conv.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    /// Fetch a conversation only when it belongs to the given session.
    pub async fn get_conversation_for_session(
        &self,
        id: &str,
        session_id: &str,
    ) -> Result<Option<Conversation>> {
        let conn = self.conn.clone();
        let id = id.to_string();
        let session_id = session_id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, session_id, title, created_at, updated_at
                 FROM conversations WHERE id = ?1 AND session_id = ?2",
            )?;
            let result = stmt
                .query_row(params![id, session_id], |row| {
                    Ok(Self::row_to_conversation(row))
                })
                .optional()?;
            match result {
                Some(Ok(conv)) => Ok(Some(conv)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        })
        .await?
    }

    pub async fn list_conversations(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>> {
        let conn = self.conn.clone();
        let session_id = session_id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, title, created_at
                 FROM conversations WHERE session_id = ?1
                 ORDER BY updated_at DESC LIMIT ?2",
            )?;
            let conversations = stmt
                .query_map(params![session_id, limit as i64], |row| {
                    Ok(Self::row_to_summary(row))
                })?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(conversations)
        })
        .await?
    }

    pub async fn touch_conversation(&self, id: &str) -> Result<()> {
        let conn = self.conn.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), id],
            )?;
            Ok(())
        })
        .await?
    }

    /// Delete a conversation within its session scope. Returns whether a
    /// row was actually removed.
    pub async fn delete_conversation(&self, id: &str, session_id: &str) -> Result<bool> {
        let conn = self.conn.clone();
        let id = id.to_string();
        let session_id = session_id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let deleted = conn.execute(
                "DELETE FROM conversations WHERE id = ?1 AND session_id = ?2",
                params![id, session_id],
            )?;
            Ok(deleted > 0)
        })
        .await?
    }

    // --- Message CRUD ---

    pub async fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        let conn = self.conn.clone();
        let msg = message.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO chat_messages (id, conversation_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.role.as_str(),
                    msg.content,
                    msg.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.conn.clone();
        let conversation_id = conversation_id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, role, content, created_at
                 FROM chat_messages WHERE conversation_id = ?1 ORDER BY created_at ASC",
            )?;
            let messages = stmt
                .query_map(params![conversation_id], |row| {
                    Ok(Self::row_to_message(row))
                })?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await?
    }

    // --- News article CRUD ---

    pub async fn insert_article(&self, article: &NewsArticle) -> Result<()> {
        let conn = self.conn.clone();
        let article = article.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO news_articles (id, title, content, excerpt, category, image_url, published_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    article.id,
                    article.title,
                    article.content,
                    article.excerpt,
                    article.category,
                    article.image_url,
                    article.published_at.to_rfc3339(),
                    article.created_at.to_rfc3339(),
                    article.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn get_article(&self, id: &str) -> Result<Option<NewsArticle>> {
        let conn = self.conn.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, title, content, excerpt, category, image_url, published_at, created_at, updated_at
                 FROM news_articles WHERE id = ?1",
            )?;
            let result = stmt
                .query_row(params![id], |row| Ok(Self::row_to_article(row)))
                .optional()?;
            match result {
                Some(Ok(article)) => Ok(Some(article)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        })
        .await?
    }

    pub async fn list_articles(&self) -> Result<Vec<NewsArticle>> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, title, content, excerpt, category, image_url, published_at, created_at, updated_at
                 FROM news_articles ORDER BY published_at DESC",
            )?;
            let articles = stmt
                .query_map([], |row| Ok(Self::row_to_article(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(articles)
        })
        .await?
    }

    /// Overwrite an article's editable fields. `updated_at` is stamped
    /// here; returns whether the row existed.
    pub async fn update_article(&self, article: &NewsArticle) -> Result<bool> {
        let conn = self.conn.clone();
        let article = article.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let updated = conn.execute(
                "UPDATE news_articles
                 SET title = ?1, content = ?2, excerpt = ?3, category = ?4, image_url = ?5, published_at = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    article.title,
                    article.content,
                    article.excerpt,
                    article.category,
                    article.image_url,
                    article.published_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    article.id,
                ],
            )?;
            Ok(updated > 0)
        })
        .await?
    }

    pub async fn delete_article(&self, id: &str) -> Result<bool> {
        let conn = self.conn.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let deleted = conn.execute("DELETE FROM news_articles WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await?
    }

    // --- News template CRUD ---

    pub async fn insert_template(&self, template: &NewsTemplate) -> Result<()> {
        let conn = self.conn.clone();
        let template = template.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO news_templates (id, name, title_template, content_template, category, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    template.id,
                    template.name,
                    template.title_template,
                    template.content_template,
                    template.category,
                    template.created_at.to_rfc3339(),
                    template.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn get_template(&self, id: &str) -> Result<Option<NewsTemplate>> {
        let conn = self.conn.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, name, title_template, content_template, category, created_at, updated_at
                 FROM news_templates WHERE id = ?1",
            )?;
            let result = stmt
                .query_row(params![id], |row| Ok(Self::row_to_template(row)))
                .optional()?;
            match result {
                Some(Ok(template)) => Ok(Some(template)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        })
        .await?
    }

    pub async fn list_templates(&self) -> Result<Vec<NewsTemplate>> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, name, title_template, content_template, category, created_at, updated_at
                 FROM news_templates ORDER BY created_at DESC",
            )?;
            let templates = stmt
                .query_map([], |row| Ok(Self::row_to_template(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(templates)
        })
        .await?
    }

    pub async fn update_template(&self, template: &NewsTemplate) -> Result<bool> {
        let conn = self.conn.clone();
        let template = template.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let updated = conn.execute(
                "UPDATE news_templates
                 SET name = ?1, title_template = ?2, content_template = ?3, category = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    template.name,
                    template.title_template,
                    template.content_template,
                    template.category,
                    Utc::now().to_rfc3339(),
                    template.id,
                ],
            )?;
            Ok(updated > 0)
        })
        .await?
    }

    pub async fn delete_template(&self, id: &str) -> Result<bool> {
        let conn = self.conn.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let deleted = conn.execute("DELETE FROM news_templates WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await?
    }

    // --- Row helpers ---

    fn row_to_conversation(row: &rusqlite::Row) -> Result<Conversation> {
        let created_str: String = row.get(3)?;
        let updated_str: String = row.get(4)?;

        Ok(Conversation {
            id: row.get(0)?,
            session_id: row.get(1)?,
            title: row.get(2)?,
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_str)?.with_timezone(&Utc),
        })
    }

    fn row_to_summary(row: &rusqlite::Row) -> Result<ConversationSummary> {
        let created_str: String = row.get(2)?;

        Ok(ConversationSummary {
            id: row.get(0)?,
            title: row.get(1)?,
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
        })
    }

    fn row_to_message(row: &rusqlite::Row) -> Result<ChatMessage> {
        let role_str: String = row.get(2)?;
        let created_str: String = row.get(4)?;

        Ok(ChatMessage {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            role: Role::from_str(&role_str)
                .ok_or_else(|| anyhow::anyhow!("Unknown role: {}", role_str))?,
            content: row.get(3)?,
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
        })
    }

    fn row_to_article(row: &rusqlite::Row) -> Result<NewsArticle> {
        let published_str: String = row.get(6)?;
        let created_str: String = row.get(7)?;
        let updated_str: String = row.get(8)?;

        Ok(NewsArticle {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            excerpt: row.get(3)?,
            category: row.get(4)?,
            image_url: row.get(5)?,
            published_at: DateTime::parse_from_rfc3339(&published_str)?.with_timezone(&Utc),
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_str)?.with_timezone(&Utc),
        })
    }

    fn row_to_template(row: &rusqlite::Row) -> Result<NewsTemplate> {
        let created_str: String = row.get(5)?;
        let updated_str: String = row.get(6)?;

        Ok(NewsTemplate {
            id: row.get(0)?,
            name: row.get(1)?,
            title_template: row.get(2)?,
            content_template: row.get(3)?,
            category: row.get(4)?,
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_str)?.with_timezone(&Utc),
        })
    }
}
