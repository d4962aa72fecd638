//! Key management HTTP handlers.
//!
//! This module implements the dashboard endpoints:
//! - GET /api/keys - List all keys, newest first
//! - POST /api/keys - Issue a new key
//! - PATCH /api/keys/{id} - Update some fields of a key
//! - DELETE /api/keys/{id} - Delete a key
//!
//! All of them sit behind the dashboard authentication middleware.

use crate::{
    app::AppState,
    error::AppError,
    handlers::parse_body,
    models::key::{CreateKeyRequest, KeyChanges, LicenseKey, UpdateKeyRequest},
    services::key_service,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use serde::Serialize;

/// Body returned by `DELETE /api/keys/{id}`.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// List every key.
///
/// # Endpoint
///
/// `GET /api/keys`
///
/// # Response
///
/// - **Success (200 OK)**: array of keys, newest first (may be empty)
/// - **Error (401)**: wrong dashboard password
/// - **Error (500)**: key store error
pub async fn list_keys(State(state): State<AppState>) -> Result<Json<Vec<LicenseKey>>, AppError> {
    let keys = key_service::list_keys(state.store.as_ref()).await?;
    Ok(Json(keys))
}

/// Issue a new key.
///
/// # Endpoint
///
/// `POST /api/keys`
///
/// # Request Body
///
/// ```json
/// {
///   "label": "Customer #42",
///   "expires_at": "2026-01-01T00:00:00Z"
/// }
/// ```
///
/// Both fields are optional and an empty body is accepted.
///
/// # Response
///
/// - **Success (200 OK)**: the stored key, including its generated token
/// - **Error (400)**: body is not valid JSON or `expires_at` is not a timestamp
/// - **Error (401)**: wrong dashboard password
/// - **Error (500)**: key store error
pub async fn create_key(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LicenseKey>, AppError> {
    let request: CreateKeyRequest = parse_body(&body)?;

    let key = key_service::create_key(state.store.as_ref(), request).await?;
    Ok(Json(key))
}

/// Update some fields of a key.
///
/// # Endpoint
///
/// `PATCH /api/keys/{id}`
///
/// # Request Body
///
/// Any subset of:
///
/// ```json
/// {
///   "enabled": false,
///   "expires_at": "",
///   "label": "Renamed",
///   "hwid": null
/// }
/// ```
///
/// Fields left out are not touched. `""` or `null` clears `expires_at` and `hwid`.
///
/// # Response
///
/// - **Success (200 OK)**: the updated key
/// - **Error (400)**: malformed body
/// - **Error (404)**: no key with this id
pub async fn update_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<LicenseKey>, AppError> {
    let request: UpdateKeyRequest = parse_body(&body)?;

    let key =
        key_service::update_key(state.store.as_ref(), &id, KeyChanges::from(request)).await?;
    Ok(Json(key))
}

/// Delete a key.
///
/// # Endpoint
///
/// `DELETE /api/keys/{id}`
///
/// # Response
///
/// Always `{"success": true}` unless the store fails; unknown ids are not an error.
pub async fn delete_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    key_service::delete_key(state.store.as_ref(), &id).await?;
    Ok(Json(DeleteResponse { success: true }))
}
