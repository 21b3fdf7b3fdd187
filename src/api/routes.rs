//! Router construction

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::api::handlers;
use crate::config::StorageBackend;
use crate::middleware::rate_limit::RateLimitLayer;
use crate::AppState;

/// Build the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body = state.settings.storage.max_avatar_bytes;
    let rate_limit = state.settings.rate_limit.clone();
    let request_timeout = state.settings.server.request_timeout();
    let storage = state.settings.storage.clone();

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/catalog", get(handlers::catalog))
        .route("/v1/sessions", post(handlers::create_session))
        .route(
            "/v1/sessions/:id",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/v1/sessions/:id/avatar", put(handlers::upload_avatar))
        .route("/v1/sessions/:id/selection", put(handlers::update_selection))
        .route("/v1/sessions/:id/enhance", post(handlers::enhance))
        .route("/v1/sessions/:id/generate", post(handlers::generate))
        .route("/v1/sessions/:id/cancel", post(handlers::cancel))
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state);

    // the local backend's public URLs point back at this server
    if storage.backend == StorageBackend::Local {
        router = router.nest_service("/assets", ServeDir::new(&storage.base_path));
    }

    if rate_limit.enabled {
        router = router.layer(RateLimitLayer::new(
            rate_limit.requests_per_second,
            rate_limit.burst_size,
        ));
    }

    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
