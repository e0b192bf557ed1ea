pub mod client;
pub mod stream;
pub mod types;
pub mod wire;

pub use client::CompletionClient;
pub use types::{CompletionBackend, CompletionError, StreamEvent};
