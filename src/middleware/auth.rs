//! Dashboard authentication middleware.
//!
//! Management endpoints are protected by a single shared secret. This middleware:
//! 1. Reads the `x-dashboard-password` header
//! 2. Compares it with the configured secret
//! 3. Rejects mismatches with HTTP 401 before the handler parses anything

use crate::{app::AppState, error::AppError};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

/// Header carrying the dashboard secret.
pub const DASHBOARD_PASSWORD_HEADER: &str = "x-dashboard-password";

/// Shared-secret authentication middleware.
///
/// # Headers
///
/// ```text
/// x-dashboard-password: <secret>
/// ```
///
/// # Returns
///
/// - `Ok(Response)` when the header matches (calls next handler)
/// - `Err(AppError::Unauthorized)` when it is missing or wrong (returns 401)
pub async fn dashboard_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_authorized(request.headers(), &state.dashboard_password) {
        tracing::debug!(path = %request.uri().path(), "Rejected management request");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Whether `headers` carry the dashboard secret.
pub fn is_authorized(headers: &HeaderMap, password: &str) -> bool {
    let supplied = headers
        .get(DASHBOARD_PASSWORD_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    supplied == password
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn matches_only_the_exact_secret() {
        let mut headers = HeaderMap::new();
        assert!(!is_authorized(&headers, "s3cret"));

        headers.insert(DASHBOARD_PASSWORD_HEADER, HeaderValue::from_static("S3CRET"));
        assert!(!is_authorized(&headers, "s3cret"));

        headers.insert(DASHBOARD_PASSWORD_HEADER, HeaderValue::from_static("s3cret"));
        assert!(is_authorized(&headers, "s3cret"));
    }
}
