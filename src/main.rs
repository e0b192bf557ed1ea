mod completion;
mod config;
mod error;
mod mail;
mod models;
mod server;
mod services;
mod state;
mod web;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use completion::CompletionClient;
use config::Config;
use mail::ResendMailer;
use services::{ChatService, Database, ImageStore, StaticNews};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let db = Database::new(&config.database_path).await?;
    let images = ImageStore::new(&config.news_image_dir).await?;

    let backend = Arc::new(CompletionClient::new(
        &config.completions_base_url,
        &config.completions_api_key,
        &config.completions_model,
    ));
    let mailer = Arc::new(ResendMailer::new(&config.resend_api_key, &config.mail_from));

    let state = AppState {
        chat: ChatService::new(db.clone(), backend),
        db,
        mailer,
        images,
        static_news: Arc::new(StaticNews::compiled()),
        config: Arc::new(config),
    };

    server::run(state).await
}
