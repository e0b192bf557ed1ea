use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::mail::templates::{self, FormMail};
use crate::models::forms::{ContactForm, RfiForm, SeminarForm, WorkshopForm};
use crate::state::AppState;

use super::origin::require_origin;

/// Notification first: its failure fails the request. The confirmation
/// back to the submitter is best-effort and only logged on failure.
async fn deliver(state: &AppState, mail: FormMail) -> Result<(), ApiError> {
    if let Err(e) = state.mailer.send(&mail.notification).await {
        tracing::error!("Failed to send notification email: {e}");
        return Err(ApiError::MailDelivery);
    }
    if let Err(e) = state.mailer.send(&mail.confirmation).await {
        tracing::error!("Failed to send confirmation email: {e}");
    }
    Ok(())
}

pub async fn send_contact_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(form): Json<ContactForm>,
) -> Result<Json<Value>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    let submission = form.validate().map_err(ApiError::Validation)?;

    tracing::info!(company = %submission.company, "Contact form received");
    deliver(&state, templates::contact_mail(&submission, &state.config)).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn send_rfi_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(form): Json<RfiForm>,
) -> Result<Json<Value>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    let submission = form.validate().map_err(ApiError::Validation)?;

    tracing::info!(company = %submission.company, "Information request received");
    deliver(&state, templates::rfi_mail(&submission, &state.config)).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn send_workshop_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(form): Json<WorkshopForm>,
) -> Result<Json<Value>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    let submission = form.validate().map_err(ApiError::Validation)?;

    tracing::info!(company = %submission.company, "Workshop entry received");
    deliver(&state, templates::workshop_mail(&submission, &state.config)).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn send_seminar_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(form): Json<SeminarForm>,
) -> Result<Json<Value>, ApiError> {
    require_origin(&headers, &state.config.allowed_origins)?;
    let submission = form.validate().map_err(ApiError::Validation)?;

    tracing::info!("Seminar signup received");
    deliver(&state, templates::seminar_mail(&submission, &state.config)).await?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::header::ORIGIN;
    use axum::http::HeaderValue;

    use super::*;
    use crate::completion::types::testing::ScriptedBackend;
    use crate::mail::testing::RecordingMailer;

    fn allowed_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static("https://allowed.example"));
        headers
    }

    fn contact_form() -> ContactForm {
        ContactForm {
            company: Some("テスト商事".to_string()),
            department: Some("開発部".to_string()),
            name: Some("山田太郎".to_string()),
            email: Some("taro@example.co.jp".to_string()),
            phone: None,
            message: Some("相談があります".to_string()),
        }
    }

    async fn state_with(mailer: Arc<RecordingMailer>) -> AppState {
        AppState::for_tests(mailer, Arc::new(ScriptedBackend::replying(vec![]))).await
    }

    #[tokio::test]
    async fn valid_submission_sends_notification_then_confirmation() {
        let mailer = Arc::new(RecordingMailer::new());
        let state = state_with(mailer.clone()).await;

        let result =
            send_contact_email(State(state.clone()), allowed_headers(), Json(contact_form())).await;
        assert!(result.is_ok());

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, state.config.notify_email);
        assert_eq!(sent[1].to, "taro@example.co.jp");
    }

    #[tokio::test]
    async fn valid_body_without_origin_is_still_rejected() {
        let mailer = Arc::new(RecordingMailer::new());
        let state = state_with(mailer.clone()).await;

        let result =
            send_contact_email(State(state), HeaderMap::new(), Json(contact_form())).await;
        assert!(matches!(result.unwrap_err(), ApiError::OriginRejected));
        assert_eq!(mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn validation_runs_only_behind_the_gate() {
        let mailer = Arc::new(RecordingMailer::new());
        let state = state_with(mailer.clone()).await;

        let mut form = contact_form();
        form.email = Some("not-an-email".to_string());

        // bad field and bad origin: the origin wins
        let result = send_contact_email(State(state.clone()), HeaderMap::new(), Json(form.clone())).await;
        assert!(matches!(result.unwrap_err(), ApiError::OriginRejected));

        let result = send_contact_email(State(state), allowed_headers(), Json(form)).await;
        assert!(matches!(
            result.unwrap_err(),
            ApiError::Validation("Invalid email")
        ));
        assert_eq!(mailer.attempts(), 0);
    }

    #[tokio::test]
    async fn notification_failure_fails_the_request_and_skips_confirmation() {
        let mailer = Arc::new(RecordingMailer::failing_at(0));
        let state = state_with(mailer.clone()).await;

        let result =
            send_contact_email(State(state), allowed_headers(), Json(contact_form())).await;
        assert!(matches!(result.unwrap_err(), ApiError::MailDelivery));
        assert_eq!(mailer.attempts(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn confirmation_failure_is_swallowed() {
        let mailer = Arc::new(RecordingMailer::failing_at(1));
        let state = state_with(mailer.clone()).await;

        let result =
            send_contact_email(State(state), allowed_headers(), Json(contact_form())).await;
        assert!(result.is_ok());
        assert_eq!(mailer.attempts(), 2);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn rfi_submission_flows_through() {
        let mailer = Arc::new(RecordingMailer::new());
        let state = state_with(mailer.clone()).await;

        let form = RfiForm {
            company: Some("テスト商事".to_string()),
            department: Some("企画部".to_string()),
            name: Some("佐藤花子".to_string()),
            email: Some("hanako@example.co.jp".to_string()),
            interests: Some(vec!["プロダクト開発".to_string()]),
            message: None,
        };
        let result = send_rfi_email(State(state), allowed_headers(), Json(form)).await;
        assert!(result.is_ok());
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn seminar_submission_flows_through() {
        let mailer = Arc::new(RecordingMailer::new());
        let state = state_with(mailer.clone()).await;

        let form = SeminarForm {
            name: Some("鈴木一郎".to_string()),
            email: Some("ichiro@example.co.jp".to_string()),
            message: None,
        };
        let result = send_seminar_email(State(state), allowed_headers(), Json(form)).await;
        assert!(result.is_ok());
        assert_eq!(mailer.sent().len(), 2);
    }
}
