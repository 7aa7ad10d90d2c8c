//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `COGNIFY_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - the JSON API under `/api`

mod api;
pub mod doc;
mod health;

use crate::middleware::{cors, trace};
use crate::state::AppState;
use axum::{Router, middleware};
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .nest("/api", api::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(state.clone(), trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::state::test::{ScriptedModel, state_with};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use cognify_llm::LanguageModel;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    /// A router over a fresh in-memory store.
    pub(crate) async fn app_with(model: Arc<dyn LanguageModel>) -> (Router, Arc<AppState>) {
        let state = state_with(model).await;
        (build(state.clone()), state)
    }

    pub(crate) async fn app() -> (Router, Arc<AppState>) {
        app_with(ScriptedModel::new(&[])).await
    }

    /// Send one request and return the status with the body as JSON
    /// (`Value::Null` for an empty body, a string for non-JSON bodies).
    pub(crate) async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    #[tokio::test]
    async fn responses_carry_a_trace_id() {
        let (app, _) = app().await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(trace::X_TRACE_ID));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (app, _) = app().await;
        let (status, _) = call(&app, Method::GET, "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
