use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::state::AppState;
use crate::web::{chat, conversations, forms, news, pages};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// The function endpoints keep their historical `/functions/v1` prefix so
/// the deployed client keeps working; everything else is the navigable
/// page surface.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let functions = Router::new()
        .route("/chat", post(chat::chat))
        .route("/send-contact-email", post(forms::send_contact_email))
        .route("/send-rfi-email", post(forms::send_rfi_email))
        .route("/send-workshop-email", post(forms::send_workshop_email))
        .route("/send-seminar-email", post(forms::send_seminar_email))
        .route("/conversations", get(conversations::list))
        .route("/conversations/{id}", delete(conversations::delete))
        .route("/conversations/{id}/messages", get(conversations::messages))
        .route("/news", get(news::feed).post(news::create))
        .route(
            "/news/{id}",
            get(news::detail).put(news::update).delete(news::delete_article),
        )
        .route(
            "/news-templates",
            get(news::list_templates).post(news::create_template),
        )
        .route(
            "/news-templates/{id}",
            put(news::update_template).delete(news::delete_template),
        )
        .route("/news-templates/{id}/apply", get(news::apply))
        .route(
            "/news-images",
            post(news::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        );

    Router::new()
        .nest("/functions/v1", functions)
        .route("/news-images/{file}", get(news::serve_image))
        .route("/", get(pages::home))
        .route("/platform", get(pages::platform))
        .route("/solutions", get(pages::solutions))
        .route("/case-studies", get(pages::case_studies))
        .route("/company", get(pages::company))
        .route("/vision", get(pages::vision))
        .route("/contact", get(pages::contact))
        .route("/rfi", get(pages::rfi))
        .route("/news", get(pages::news_index))
        .route("/news/{id}", get(pages::news_detail))
        .route("/admin/news", get(pages::admin_news))
        .route("/chat", get(pages::chat))
        .route("/workshop", get(pages::workshop))
        .route("/seminar", get(pages::seminar))
        .fallback(pages::not_found)
        .layer(cors)
        .with_state(state)
}

pub async fn run(state: AppState) -> Result<()> {
    let address = state.config.bind_address;
    let app = build_router(state);

    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
