use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Published announcement, either stored in the database or compiled in
/// as a launch entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reusable article scaffold edited in the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsTemplate {
    pub id: String,
    pub name: String,
    pub title_template: String,
    pub content_template: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable seed produced by applying a template. The admin fills it in
/// and submits it as a new article; the template itself stays untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub category: String,
}

/// One entry in the public feed. Database articles and compiled launch
/// entries both project into this shape so the merged feed sorts on a
/// single canonical timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub category: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl From<&NewsArticle> for FeedEntry {
    fn from(article: &NewsArticle) -> Self {
        FeedEntry {
            id: article.id.clone(),
            title: article.title.clone(),
            excerpt: article.excerpt.clone(),
            category: article.category.clone(),
            image_url: article.image_url.clone(),
            published_at: article.published_at,
        }
    }
}
