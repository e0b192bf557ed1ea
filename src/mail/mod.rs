pub mod resend;
pub mod templates;

pub use resend::ResendMailer;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Mail API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
}

/// One outbound transactional email. The sender identity comes from the
/// mailer's own configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Transactional mail delivery. The production implementation posts to
/// the Resend HTTP API; tests install a recording stand-in.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}
