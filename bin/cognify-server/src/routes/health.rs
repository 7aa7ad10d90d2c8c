//! Liveness endpoint; also reports whether the database answers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthResponse)))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `"ok"`, or `"degraded"` when the database does not answer.
    pub status: String,
    /// `"ok"` or `"unavailable"`.
    pub database: String,
    /// Model name sent with every completion request.
    pub model: String,
    pub version: String,
    pub timestamp: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let database_up = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "database ping failed");
            false
        }
    };
    let (code, status, database) = if database_up {
        (StatusCode::OK, "ok", "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
    };
    let body = HealthResponse {
        status: status.to_owned(),
        database: database.to_owned(),
        model: state.config.llm.model.clone(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        timestamp: Utc::now().to_rfc3339(),
    };
    (code, Json(body))
}

#[cfg(test)]
mod test {
    use crate::routes::test::{app, call};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn reports_database_and_model() {
        let (app, state) = app().await;
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "ok");
        assert_eq!(body["model"], state.config.llm.model.as_str());
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn closed_database_is_degraded() {
        let (app, state) = app().await;
        state.store.pool().close().await;
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], "unavailable");
    }
}
