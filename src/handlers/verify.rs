//! Public key verification endpoint.

use axum::{Json, body::Bytes, extract::State};

use crate::{
    app::AppState,
    handlers::parse_body,
    models::verification::{DenyReason, Verification, VerifyRequest},
    services::key_service,
};

/// Verify a key for a client application.
///
/// # Endpoint
///
/// `POST /api/verify` (no authentication)
///
/// # Request Body
///
/// ```json
/// { "key": "AbCdEfGh12345678", "hwid": "machine-fingerprint" }
/// ```
///
/// # Response (always 200 OK)
///
/// ```json
/// { "valid": true, "label": "Customer #42", "expires_at": null, "hwid": "machine-fingerprint" }
/// ```
///
/// or `{"valid": false, "reason": "..."}`. Clients treat any other status as
/// an unexplained failure, so malformed bodies and store errors are reported
/// in the same shape.
pub async fn verify_key(State(state): State<AppState>, body: Bytes) -> Json<Verification> {
    let request: VerifyRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!("Rejected verify body: {}", err);
            return Json(DenyReason::InvalidRequest.into());
        }
    };

    let verification = key_service::verify_key(
        state.store.as_ref(),
        &request.key,
        request.hwid.as_deref(),
    )
    .await;

    Json(verification)
}
