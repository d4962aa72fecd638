//! Error types and HTTP error response handling.
//!
//! This module defines the errors management endpoints can return and how they
//! are converted into HTTP responses. Verification never produces an `AppError`;
//! it folds failures into its own result type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Store Errors**: any failure talking to the key store
/// - **Authentication Errors**: missing or wrong dashboard password
/// - **Resource Errors**: key or route not found
/// - **Validation Errors**: malformed request body
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Key store operation failed (connection error, query error, bad status).
    ///
    /// Returns HTTP 500. The underlying error is logged, not sent to the client.
    #[error("Database error")]
    Store(#[from] StoreError),

    /// `x-dashboard-password` header missing or wrong.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Unauthorized")]
    Unauthorized,

    /// No key matches the requested id.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Key not found")]
    KeyNotFound,

    /// No route matches the request.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Not found")]
    RouteNotFound,

    /// Request body could not be decoded.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// { "detail": "Human-readable error message" }
/// ```
///
/// # Status Code Mapping
///
/// - `Unauthorized` → 401 Unauthorized
/// - `KeyNotFound`, `RouteNotFound` → 404 Not Found
/// - `InvalidRequest` → 400 Bad Request
/// - `Store` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::KeyNotFound | AppError::RouteNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(err) => {
                tracing::error!("Key store failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
