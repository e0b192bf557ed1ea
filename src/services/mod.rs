pub mod chat;
pub mod conversations;
pub mod database;
pub mod news;
pub mod storage;

pub use chat::ChatService;
pub use database::Database;
pub use news::StaticNews;
pub use storage::ImageStore;
