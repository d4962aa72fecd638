//! Router assembly and shared handler state.

use std::sync::Arc;

use axum::{
    Router,
    http::Method,
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, middleware, store::SharedKeyStore};

/// State shared by every handler via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedKeyStore,
    pub dashboard_password: Arc<str>,
}

impl AppState {
    pub fn new(store: SharedKeyStore, dashboard_password: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            dashboard_password: dashboard_password.into(),
        }
    }
}

/// CORS open to every origin; preflight `OPTIONS` requests are answered here with 200.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
}

/// Build the HTTP router.
///
/// # Routes
///
/// - `POST /api/verify` and `GET /health` are public
/// - `/api/keys` and `/api/keys/{id}` require the dashboard password, as does
///   any other PATCH or DELETE under `/api/keys/`
/// - anything else, including an unsupported method on a known path, is 404
pub fn build_router(state: AppState) -> Router {
    // Management routes; the auth layer runs before any body is read
    let management_routes = Router::new()
        .route(
            "/api/keys",
            get(handlers::keys::list_keys).post(handlers::keys::create_key),
        )
        .route(
            "/api/keys/{id}",
            patch(handlers::keys::update_key).delete(handlers::keys::delete_key),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::dashboard_auth,
        ));

    Router::new()
        // Public routes (no authentication required)
        .route("/api/verify", post(handlers::verify::verify_key))
        .route("/health", get(handlers::health::health_check))
        .merge(management_routes)
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
        .with_state(state)
}
