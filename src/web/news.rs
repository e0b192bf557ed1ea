use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::forms::is_valid_string;
use crate::models::{ArticleDraft, FeedEntry, NewsArticle, NewsTemplate};
use crate::services::news;
use crate::services::ImageStore;
use crate::state::AppState;

use super::origin::require_origin;

/// Article fields as posted by the admin screen. Optional at the serde
/// level so an absent field reads as a validation failure, not a
/// deserialization one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticlePayload {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplatePayload {
    pub name: Option<String>,
    pub title_template: Option<String>,
    pub content_template: Option<String>,
    pub category: Option<String>,
}

/// Base64 upload from the admin screen, either raw or as a `data:` URL.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub data: Option<String>,
}

struct ArticleFields {
    title: String,
    content: String,
    excerpt: Option<String>,
    category: String,
    image_url: Option<String>,
    published_at: DateTime<Utc>,
}

struct TemplateFields {
    name: String,
    title_template: String,
    content_template: String,
    category: String,
}

fn non_blank(value: Option<&str>) -> bool {
    value.map(str::trim).is_some_and(|v| !v.is_empty())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_article(payload: ArticlePayload) -> Result<ArticleFields, &'static str> {
    if !is_valid_string(payload.title.as_deref(), 200) {
        return Err("Invalid title");
    }
    // stored HTML, blank check only
    if !non_blank(payload.content.as_deref()) {
        return Err("Invalid content");
    }
    if !is_valid_string(payload.category.as_deref(), 100) {
        return Err("Invalid category");
    }
    let Some(published_at) = payload.published_at else {
        return Err("Invalid published date");
    };

    Ok(ArticleFields {
        title: payload.title.unwrap_or_default().trim().to_string(),
        content: payload.content.unwrap_or_default().trim().to_string(),
        excerpt: optional(payload.excerpt),
        category: payload.category.unwrap_or_default().trim().to_string(),
        image_url: optional(payload.image_url),
        published_at,
    })
}

fn validate_template(payload: TemplatePayload) -> Result<TemplateFields, &'static str> {
    if !is_valid_string(payload.name.as_deref(), 100) {
        return Err("Invalid template name");
    }
    if !is_valid_string(payload.title_template.as_deref(), 200) {
        return Err("Invalid title template");
    }
    if !non_blank(payload.content_template.as_deref()) {
        return Err("Invalid content template");
    }
    if !is_valid_string(payload.category.as_deref(), 100) {
        return Err("Invalid category");
    }

    Ok(TemplateFields {
        name: payload.name.unwrap_or_default().trim().to_string(),
        title_template: payload.title_template.unwrap_or_default().trim().to_string(),
        content_template: payload
            .content_template
            .unwrap_or_default()
            .trim()
            .to_string(),
        category: payload.category.unwrap_or_default().trim().to_string(),
    })
}

pub async fn feed(State(state): State<AppState>) -> Result<Json<Vec<FeedEntry>>, ApiError> {
    let entries = news::feed(&state.db, &state.static_news).await?;
    Ok(Json(entries))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NewsArticle>, ApiError> {
    let article = news::find_article(&state.db, &state.static_news, &id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(article))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ArticlePayload>,
) -> Result<Json<NewsArticle>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    let fields = validate_article(payload).map_err(ApiError::Validation)?;

    let now = Utc::now();
    let article = NewsArticle {
        id: Uuid::new_v4().to_string(),
        title: fields.title,
        content: fields.content,
        excerpt: fields.excerpt,
        category: fields.category,
        image_url: fields.image_url,
        published_at: fields.published_at,
        created_at: now,
        updated_at: now,
    };
    state.db.insert_article(&article).await?;

    tracing::info!(id = %article.id, "News article created");
    Ok(Json(article))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ArticlePayload>,
) -> Result<Json<NewsArticle>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    let fields = validate_article(payload).map_err(ApiError::Validation)?;

    // the timestamps here are placeholders; the UPDATE leaves created_at
    // alone and stamps updated_at itself
    let now = Utc::now();
    let article = NewsArticle {
        id: id.clone(),
        title: fields.title,
        content: fields.content,
        excerpt: fields.excerpt,
        category: fields.category,
        image_url: fields.image_url,
        published_at: fields.published_at,
        created_at: now,
        updated_at: now,
    };
    if !state.db.update_article(&article).await? {
        return Err(ApiError::NotFound);
    }

    let stored = state
        .db
        .get_article(&id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(stored))
}

pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    if !state.db.delete_article(&id).await? {
        tracing::debug!(%id, "Delete for unknown article");
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsTemplate>>, ApiError> {
    Ok(Json(state.db.list_templates().await?))
}

pub async fn create_template(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TemplatePayload>,
) -> Result<Json<NewsTemplate>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    let fields = validate_template(payload).map_err(ApiError::Validation)?;

    let now = Utc::now();
    let template = NewsTemplate {
        id: Uuid::new_v4().to_string(),
        name: fields.name,
        title_template: fields.title_template,
        content_template: fields.content_template,
        category: fields.category,
        created_at: now,
        updated_at: now,
    };
    state.db.insert_template(&template).await?;

    tracing::info!(id = %template.id, "News template created");
    Ok(Json(template))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<TemplatePayload>,
) -> Result<Json<NewsTemplate>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    let fields = validate_template(payload).map_err(ApiError::Validation)?;

    let now = Utc::now();
    let template = NewsTemplate {
        id: id.clone(),
        name: fields.name,
        title_template: fields.title_template,
        content_template: fields.content_template,
        category: fields.category,
        created_at: now,
        updated_at: now,
    };
    if !state.db.update_template(&template).await? {
        return Err(ApiError::NotFound);
    }

    let stored = state
        .db
        .get_template(&id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(stored))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    if !state.db.delete_template(&id).await? {
        tracing::debug!(%id, "Delete for unknown template");
    }
    Ok(Json(json!({ "success": true })))
}

/// Applying never touches the stored template; it only copies the raw
/// field values into a draft for the admin to edit.
pub async fn apply(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ArticleDraft>, ApiError> {
    let template = state
        .db
        .get_template(&id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(news::apply_template(&template)))
}

pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(upload): Json<ImageUpload>,
) -> Result<Json<Value>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;

    let Some(file_name) = upload
        .file_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    else {
        return Err(ApiError::Validation("Invalid file name"));
    };
    let bytes =
        decode_image(upload.data.as_deref().unwrap_or_default()).map_err(ApiError::Validation)?;

    let name = ImageStore::generate_name(file_name);
    state.images.save(&name, &bytes).await?;

    tracing::info!(%name, size = bytes.len(), "News image stored");
    Ok(Json(json!({ "url": format!("/news-images/{name}") })))
}

pub async fn serve_image(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.images.load(&file).await?.ok_or(ApiError::NotFound)?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&file))], bytes))
}

fn decode_image(data: &str) -> Result<Vec<u8>, &'static str> {
    let encoded = match data.rsplit_once("base64,") {
        Some((_, tail)) => tail,
        None => data,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| "Invalid image data")?;
    if bytes.is_empty() {
        return Err("Invalid image data");
    }
    Ok(bytes)
}

fn content_type_for(name: &str) -> &'static str {
    match std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::header::ORIGIN;
    use axum::http::HeaderValue;

    use super::*;
    use crate::completion::types::testing::ScriptedBackend;
    use crate::mail::testing::RecordingMailer;

    async fn state() -> AppState {
        AppState::for_tests(
            Arc::new(RecordingMailer::new()),
            Arc::new(ScriptedBackend::replying(vec![])),
        )
        .await
    }

    fn allowed_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("https://allowed.example"));
        headers
    }

    fn article_payload() -> ArticlePayload {
        ArticlePayload {
            title: Some("新サービスのお知らせ".to_string()),
            content: Some("<p>本日より提供開始します。</p>".to_string()),
            excerpt: Some("提供開始のお知らせ".to_string()),
            category: Some("プロダクト".to_string()),
            image_url: None,
            published_at: Some(Utc::now()),
        }
    }

    fn template_payload() -> TemplatePayload {
        TemplatePayload {
            name: Some("リリース告知".to_string()),
            title_template: Some("【リリース】{{製品名}}".to_string()),
            content_template: Some("<p>{{日付}}にリリースします。</p>".to_string()),
            category: Some("プロダクト".to_string()),
        }
    }

    #[tokio::test]
    async fn article_crud_roundtrip() {
        let state = state().await;

        let Json(created) = create(
            State(state.clone()),
            allowed_headers(),
            Json(article_payload()),
        )
        .await
        .unwrap();
        assert_eq!(created.title, "新サービスのお知らせ");

        let Json(fetched) = detail(State(state.clone()), Path(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(fetched.content, "<p>本日より提供開始します。</p>");

        let mut changed = article_payload();
        changed.title = Some("改訂版のお知らせ".to_string());
        let Json(updated) = update(
            State(state.clone()),
            Path(created.id.clone()),
            allowed_headers(),
            Json(changed),
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "改訂版のお知らせ");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        delete_article(
            State(state.clone()),
            Path(created.id.clone()),
            allowed_headers(),
        )
        .await
        .unwrap();
        let missing = detail(State(state), Path(created.id)).await;
        assert!(matches!(missing.unwrap_err(), ApiError::NotFound));
    }

    #[tokio::test]
    async fn mutations_are_origin_gated_but_reads_stay_open() {
        let state = state().await;

        let result = create(State(state.clone()), HeaderMap::new(), Json(article_payload())).await;
        assert!(matches!(result.unwrap_err(), ApiError::OriginRejected));

        let result = delete_article(
            State(state.clone()),
            Path("x".to_string()),
            HeaderMap::new(),
        )
        .await;
        assert!(matches!(result.unwrap_err(), ApiError::OriginRejected));

        let Json(entries) = feed(State(state)).await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn article_validation_messages() {
        let state = state().await;

        let mut blank_title = article_payload();
        blank_title.title = Some("   ".to_string());
        let result = create(State(state.clone()), allowed_headers(), Json(blank_title)).await;
        assert!(matches!(
            result.unwrap_err(),
            ApiError::Validation("Invalid title")
        ));

        let mut no_date = article_payload();
        no_date.published_at = None;
        let result = create(State(state), allowed_headers(), Json(no_date)).await;
        assert!(matches!(
            result.unwrap_err(),
            ApiError::Validation("Invalid published date")
        ));
    }

    #[tokio::test]
    async fn updating_a_missing_article_is_not_found() {
        let state = state().await;
        let result = update(
            State(state),
            Path("missing".to_string()),
            allowed_headers(),
            Json(article_payload()),
        )
        .await;
        assert!(matches!(result.unwrap_err(), ApiError::NotFound));
    }

    #[tokio::test]
    async fn feed_includes_created_articles() {
        let state = state().await;

        let mut payload = article_payload();
        payload.published_at = Some(Utc::now() + chrono::Duration::days(30));
        let Json(created) = create(State(state.clone()), allowed_headers(), Json(payload))
            .await
            .unwrap();

        let Json(entries) = feed(State(state)).await.unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].id, created.id);
    }

    #[tokio::test]
    async fn template_crud_and_apply() {
        let state = state().await;

        let Json(template) = create_template(
            State(state.clone()),
            allowed_headers(),
            Json(template_payload()),
        )
        .await
        .unwrap();

        let Json(draft) = apply(State(state.clone()), Path(template.id.clone()))
            .await
            .unwrap();
        assert_eq!(draft.title, "【リリース】{{製品名}}");

        // applying twice yields the same draft and leaves the template alone
        let Json(again) = apply(State(state.clone()), Path(template.id.clone()))
            .await
            .unwrap();
        assert_eq!(draft, again);

        let Json(stored) = list_templates(State(state.clone())).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title_template, "【リリース】{{製品名}}");

        let mut changed = template_payload();
        changed.name = Some("改訂テンプレート".to_string());
        let Json(updated) = update_template(
            State(state.clone()),
            Path(template.id.clone()),
            allowed_headers(),
            Json(changed),
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "改訂テンプレート");

        delete_template(
            State(state.clone()),
            Path(template.id.clone()),
            allowed_headers(),
        )
        .await
        .unwrap();
        let result = apply(State(state), Path(template.id)).await;
        assert!(matches!(result.unwrap_err(), ApiError::NotFound));
    }

    #[tokio::test]
    async fn template_validation_messages() {
        let state = state().await;

        let mut bad = template_payload();
        bad.name = None;
        let result = create_template(State(state.clone()), allowed_headers(), Json(bad)).await;
        assert!(matches!(
            result.unwrap_err(),
            ApiError::Validation("Invalid template name")
        ));

        let mut bad = template_payload();
        bad.content_template = Some(String::new());
        let result = create_template(State(state), allowed_headers(), Json(bad)).await;
        assert!(matches!(
            result.unwrap_err(),
            ApiError::Validation("Invalid content template")
        ));
    }

    #[tokio::test]
    async fn image_upload_roundtrip() {
        let state = state().await;

        let encoded = base64::engine::general_purpose::STANDARD.encode(b"png bytes");
        let upload = ImageUpload {
            file_name: Some("photo.png".to_string()),
            data: Some(format!("data:image/png;base64,{encoded}")),
        };
        let Json(body) = upload_image(State(state.clone()), allowed_headers(), Json(upload))
            .await
            .unwrap();

        let url = body["url"].as_str().unwrap();
        let name = url.strip_prefix("/news-images/").unwrap().to_string();
        assert!(name.ends_with(".png"));

        let stored = state.images.load(&name).await.unwrap();
        assert_eq!(stored.as_deref(), Some(b"png bytes".as_ref()));
    }

    #[tokio::test]
    async fn bad_uploads_are_rejected() {
        let state = state().await;

        let upload = ImageUpload {
            file_name: Some("photo.png".to_string()),
            data: Some("not base64!!".to_string()),
        };
        let result = upload_image(State(state.clone()), allowed_headers(), Json(upload)).await;
        assert!(matches!(
            result.unwrap_err(),
            ApiError::Validation("Invalid image data")
        ));

        let upload = ImageUpload {
            file_name: None,
            data: Some("aGVsbG8=".to_string()),
        };
        let result = upload_image(State(state), allowed_headers(), Json(upload)).await;
        assert!(matches!(
            result.unwrap_err(),
            ApiError::Validation("Invalid file name")
        ));
    }

    #[tokio::test]
    async fn unknown_images_are_not_found() {
        let state = state().await;
        let result = serve_image(State(state), Path("nope.png".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[test]
    fn content_types_follow_the_extension() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("shot.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("logo.svg"), "image/svg+xml");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
