use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};

use crate::models::{ArticleDraft, FeedEntry, NewsArticle, NewsTemplate};
use crate::services::database::Database;

/// Launch announcements that predate the database. They ship inside the
/// binary, keep their original slugs as ids, and merge into the feed
/// next to admin-created rows.
pub struct StaticNews {
    entries: Vec<NewsArticle>,
}

impl StaticNews {
    pub fn compiled() -> Self {
        StaticNews {
            entries: vec![
                entry(
                    "site-launch",
                    (2025, 6, 2),
                    "コーポレートサイトを公開しました",
                    "お知らせ",
                    "新しいコーポレートサイトを公開しました。",
                    "本日、コーポレートサイトを公開しました。事業内容や導入事例は各ページをご覧ください。",
                ),
                entry(
                    "chat-launch",
                    (2025, 7, 14),
                    "AIチャット窓口を開設しました",
                    "プロダクト",
                    "サイト内のチャットからお気軽にご質問いただけます。",
                    "サイト右下のチャットウィンドウから、サービスに関するご質問にAIがお答えします。営業時間外でもご利用いただけます。",
                ),
                entry(
                    "workshop-recruiting",
                    (2025, 9, 1),
                    "ワークショップ第1期の募集を開始しました",
                    "イベント",
                    "少人数制ワークショップの参加企業を募集しています。",
                    "開発チーム向けワークショップの第1期参加企業の募集を開始しました。詳細はワークショップページをご覧ください。",
                ),
            ],
        }
    }

    pub fn entries(&self) -> &[NewsArticle] {
        &self.entries
    }

    pub fn find(&self, id: &str) -> Option<&NewsArticle> {
        self.entries.iter().find(|e| e.id == id)
    }
}

fn entry(
    id: &str,
    (year, month, day): (i32, u32, u32),
    title: &str,
    category: &str,
    excerpt: &str,
    content: &str,
) -> NewsArticle {
    let published_at: DateTime<Utc> = Utc
        .with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .expect("static publish date");

    NewsArticle {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        excerpt: Some(excerpt.to_string()),
        category: category.to_string(),
        image_url: None,
        published_at,
        created_at: published_at,
        updated_at: published_at,
    }
}

/// The public feed: stored articles and compiled entries merged, newest
/// `published_at` first.
pub async fn feed(db: &Database, statics: &StaticNews) -> Result<Vec<FeedEntry>> {
    let mut entries: Vec<FeedEntry> = db
        .list_articles()
        .await?
        .iter()
        .map(FeedEntry::from)
        .collect();
    entries.extend(statics.entries().iter().map(FeedEntry::from));
    entries.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    Ok(entries)
}

/// Look an article up by id, preferring the database over the compiled
/// entries.
pub async fn find_article(
    db: &Database,
    statics: &StaticNews,
    id: &str,
) -> Result<Option<NewsArticle>> {
    if let Some(article) = db.get_article(id).await? {
        return Ok(Some(article));
    }
    Ok(statics.find(id).cloned())
}

/// Copy a template's fields into a fresh draft. Applying is a pure read;
/// the stored template is never modified.
pub fn apply_template(template: &NewsTemplate) -> ArticleDraft {
    ArticleDraft {
        title: template.title_template.clone(),
        content: template.content_template.clone(),
        category: template.category.clone(),
    }
}
