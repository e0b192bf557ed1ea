pub mod chat;
pub mod conversations;
pub mod forms;
pub mod news;
pub mod origin;
pub mod pages;
