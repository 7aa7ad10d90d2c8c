//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body
//! `{"error": "..."}` with an appropriate status code.
//!
//! Internal errors (LLM, Database) are logged with full detail; callers only
//! see a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cognify_llm::LlmError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// All errors that can occur in the cognify-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The LLM backend or the code-execution API failed.
    #[error("upstream error: {0}")]
    Llm(#[from] LlmError),

    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),

            ServerError::Llm(LlmError::UnsupportedLanguage(lang)) => {
                (StatusCode::BAD_REQUEST, format!("Unsupported language: {lang}"))
            }
            ServerError::Llm(e @ LlmError::Generation(_)) => {
                error!(error = %e, "model output unusable");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ServerError::Llm(e) => {
                error!(error = %e, "AI backend error");
                (
                    StatusCode::BAD_GATEWAY,
                    "Connection error, make sure your AI server is running".to_owned(),
                )
            }
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_owned())
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_owned())
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<validator::ValidationErrors> for ServerError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServerError::BadRequest(e.to_string())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::Internal(format!("corrupt JSON column: {e}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: ServerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn client_errors_expose_message() {
        let (status, body) = body_of(ServerError::NotFound("Roadmap not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Roadmap not found");
    }

    #[tokio::test]
    async fn upstream_failures_are_bad_gateway() {
        let err = ServerError::Llm(LlmError::Status { status: 500, body: "boom".into() });
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Connection error, make sure your AI server is running");
    }

    #[tokio::test]
    async fn internal_details_stay_private() {
        let (status, body) = body_of(ServerError::Internal("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
