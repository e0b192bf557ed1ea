use std::sync::Arc;

use crate::config::Config;
use crate::mail::Mailer;
use crate::services::{ChatService, Database, ImageStore, StaticNews};

/// Shared state threaded through every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub chat: ChatService,
    pub mailer: Arc<dyn Mailer>,
    pub images: ImageStore,
    pub static_news: Arc<StaticNews>,
}

#[cfg(test)]
impl AppState {
    pub async fn for_tests(
        mailer: Arc<dyn Mailer>,
        backend: Arc<dyn crate::completion::CompletionBackend>,
    ) -> Self {
        let config = Config::for_tests();
        let db = Database::new_in_memory().unwrap();
        let images = ImageStore::new(&config.news_image_dir).await.unwrap();

        AppState {
            chat: ChatService::new(db.clone(), backend),
            db,
            mailer,
            images,
            static_news: Arc::new(StaticNews::compiled()),
            config: Arc::new(config),
        }
    }
}
