//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to the key service
//! 3. Returns HTTP response (JSON, status code)

use axum::{
    extract::State,
    http::{HeaderMap, Method, Uri},
};
use serde::de::DeserializeOwned;

use crate::{app::AppState, error::AppError, middleware::auth::is_authorized};

/// Path prefix of single-key management requests.
const KEY_PATH_PREFIX: &str = "/api/keys/";

/// Key management endpoints
pub mod keys;
/// Public verification endpoint
pub mod verify;
/// Service health endpoint
pub mod health;

/// Decode a JSON request body.
///
/// The body is read regardless of `Content-Type`, and an empty body decodes
/// as `T::default()` (as if `{}` had been sent).
pub fn parse_body<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|err| AppError::InvalidRequest(err.to_string()))
}

/// Fallback for unknown routes and unsupported methods.
///
/// A PATCH or DELETE anywhere under `/api/keys/` is still a management request
/// even when the rest of the path is not a single id: it is authenticated
/// first and then answered with `Key not found`.
pub async fn not_found(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> AppError {
    let is_key_write = method == Method::PATCH || method == Method::DELETE;

    if is_key_write && uri.path().starts_with(KEY_PATH_PREFIX) {
        if !is_authorized(&headers, &state.dashboard_password) {
            return AppError::Unauthorized;
        }
        return AppError::KeyNotFound;
    }

    AppError::RouteNotFound
}
