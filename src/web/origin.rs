use axum::http::header::{ORIGIN, REFERER};
use axum::http::HeaderMap;

use crate::error::ApiError;

/// Gate for the form and admin endpoints: the request passes when either
/// the `Origin` or the `Referer` header prefix-matches an allowed
/// origin. Browsers send at least one of the two on real form posts;
/// requests carrying neither are rejected.
pub fn origin_allowed(headers: &HeaderMap, allowed: &[String]) -> bool {
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    let referer = headers.get(REFERER).and_then(|v| v.to_str().ok());

    matches_allowed(origin, allowed) || matches_allowed(referer, allowed)
}

/// The gate as an error, applied before any body validation.
pub fn require_origin(headers: &HeaderMap, allowed: &[String]) -> Result<(), ApiError> {
    if origin_allowed(headers, allowed) {
        Ok(())
    } else {
        tracing::warn!("Blocked request from unauthorized origin");
        Err(ApiError::OriginRejected)
    }
}

fn matches_allowed(value: Option<&str>, allowed: &[String]) -> bool {
    match value {
        Some(v) if !v.is_empty() => allowed.iter().any(|a| v.starts_with(a.as_str())),
        _ => false,
    }
}
