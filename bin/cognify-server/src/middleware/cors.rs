use crate::state::AppState;
use axum::http::HeaderValue;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Allow the configured origins, or any origin when none are configured.
pub fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        // Set COGNIFY_CORS_ORIGINS in production.
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
