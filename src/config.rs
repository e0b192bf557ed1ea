use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),

    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Runtime configuration, read once at startup from the environment
/// (with `.env` support for local development).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_path: PathBuf,
    pub news_image_dir: PathBuf,
    /// Origins allowed to post forms, matched by prefix against the
    /// `Origin` and `Referer` headers.
    pub allowed_origins: Vec<String>,
    /// Shared key the public site sends as a bearer token on chat calls.
    pub publishable_key: String,
    pub completions_base_url: String,
    pub completions_api_key: String,
    pub completions_model: String,
    pub resend_api_key: String,
    /// `From` line for all outgoing mail, e.g. `Site <noreply@example.com>`.
    pub mail_from: String,
    /// Inbox that receives form notifications.
    pub notify_email: String,
    pub company_name: String,
    pub site_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_raw = optional("BIND_ADDR", "0.0.0.0:8080");
        let bind_address: SocketAddr = bind_raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BIND_ADDR".to_string(), bind_raw.clone()))?;

        Ok(Config {
            bind_address,
            database_path: PathBuf::from(optional("DATABASE_PATH", "data/site.db")),
            news_image_dir: PathBuf::from(optional("NEWS_IMAGE_DIR", "data/news-images")),
            allowed_origins: parse_origins(&optional(
                "ALLOWED_ORIGINS",
                "http://localhost:5173,http://localhost:8080",
            )),
            publishable_key: required("PUBLISHABLE_KEY")?,
            completions_base_url: optional("COMPLETIONS_BASE_URL", "https://api.openai.com/v1"),
            completions_api_key: required("COMPLETIONS_API_KEY")?,
            completions_model: optional("COMPLETIONS_MODEL", "gpt-4o-mini"),
            resend_api_key: required("RESEND_API_KEY")?,
            mail_from: required("MAIL_FROM")?,
            notify_email: required("NOTIFY_EMAIL")?,
            company_name: optional("COMPANY_NAME", "Vitrine"),
            site_url: optional("SITE_URL", "https://example.com"),
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
}

fn optional(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}

/// Comma-separated origin list; entries are trimmed and trailing slashes
/// dropped so `Origin` header values compare cleanly.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_path: PathBuf::from(":memory:"),
            news_image_dir: std::env::temp_dir().join(format!("vitrine-test-{}", uuid::Uuid::new_v4())),
            allowed_origins: vec![
                "https://allowed.example".to_string(),
                "http://localhost:5173".to_string(),
            ],
            publishable_key: "test-publishable-key".to_string(),
            completions_base_url: "http://127.0.0.1:9".to_string(),
            completions_api_key: "test-api-key".to_string(),
            completions_model: "test-model".to_string(),
            resend_api_key: "test-resend-key".to_string(),
            mail_from: "Vitrine <noreply@example.com>".to_string(),
            notify_email: "desk@example.com".to_string(),
            company_name: "Vitrine".to_string(),
            site_url: "https://example.com".to_string(),
        }
    }
}
