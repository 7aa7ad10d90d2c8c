use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::entities::ChatStore;
use crate::error::ServerError;
use crate::schemas::chat::{
    CreateSessionRequest, MessageResponse, MessageRole, RenameSessionRequest, SaveMessageRequest,
    SessionResponse, SessionSummaryResponse,
};
use crate::schemas::{DeletedResponse, LimitQuery};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session,
        list_sessions,
        rename_session,
        delete_session,
        save_message,
        list_session_messages,
        list_user_messages,
        clear_user_chat
    ),
    components(schemas(
        CreateSessionRequest,
        RenameSessionRequest,
        SaveMessageRequest,
        MessageRole,
        SessionResponse,
        SessionSummaryResponse,
        MessageResponse,
        DeletedResponse
    ))
)]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/sessions", post(create_session))
        .route(
            "/chat/sessions/{id}",
            get(list_sessions).put(rename_session).delete(delete_session),
        )
        .route("/chat/messages", post(save_message))
        .route("/chat/messages/{id}", get(list_session_messages))
        .route("/chat/{id}", get(list_user_messages).delete(clear_user_chat))
}

#[utoipa::path(
    post,
    path = "/api/chat/sessions",
    tag = "chat",
    request_body = CreateSessionRequest,
    responses((status = 200, description = "Session created", body = SessionResponse))
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    let session = state.store.create_session(req.user_id, req.title.as_deref()).await?;
    info!(session_id = session.id, user_id = req.user_id, "chat session created");
    Ok(Json(session.to_response()))
}

/// Sessions of a user, most recently active first.
#[utoipa::path(
    get,
    path = "/api/chat/sessions/{id}",
    tag = "chat",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Session list", body = Vec<SessionSummaryResponse>))
)]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<SessionSummaryResponse>>, ServerError> {
    let sessions = state.store.list_sessions(user_id).await?;
    Ok(Json(sessions.iter().map(|s| s.to_response()).collect()))
}

#[utoipa::path(
    put,
    path = "/api/chat/sessions/{id}",
    tag = "chat",
    params(("id" = i64, Path, description = "Session id")),
    request_body = RenameSessionRequest,
    responses(
        (status = 200, description = "Session renamed", body = SessionResponse),
        (status = 404, description = "Session not found"),
    )
)]
pub async fn rename_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<RenameSessionRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    req.validate()?;
    let session = state
        .store
        .rename_session(id, &req.title)
        .await?
        .ok_or_else(|| ServerError::NotFound("Session not found".into()))?;
    Ok(Json(session.to_response()))
}

#[utoipa::path(
    delete,
    path = "/api/chat/sessions/{id}",
    tag = "chat",
    params(("id" = i64, Path, description = "Session id")),
    responses((status = 200, description = "Deletion result", body = DeletedResponse))
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ServerError> {
    let deleted = state.store.delete_session(id).await?;
    info!(session_id = id, deleted, "chat session deleted");
    Ok(Json(DeletedResponse { deleted }))
}

/// Store a message; the first user message names a "New Chat" session.
#[utoipa::path(
    post,
    path = "/api/chat/messages",
    tag = "chat",
    request_body = SaveMessageRequest,
    responses(
        (status = 200, description = "Message stored", body = MessageResponse),
        (status = 404, description = "Session not found"),
    )
)]
pub async fn save_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveMessageRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    req.validate()?;
    if let Some(session_id) = req.session_id {
        state
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| ServerError::NotFound("Session not found".into()))?;
    }
    let message = state
        .store
        .append_message(req.user_id, req.session_id, req.role.as_ref(), &req.content)
        .await?;
    Ok(Json(message.to_response()))
}

#[utoipa::path(
    get,
    path = "/api/chat/messages/{id}",
    tag = "chat",
    params(("id" = i64, Path, description = "Session id")),
    responses((status = 200, description = "Messages, oldest first", body = Vec<MessageResponse>))
)]
pub async fn list_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<i64>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let messages = state.store.list_messages(session_id).await?;
    Ok(Json(messages.iter().map(|m| m.to_response()).collect()))
}

/// Every message of a user across sessions (pre-session clients).
#[utoipa::path(
    get,
    path = "/api/chat/{id}",
    tag = "chat",
    params(("id" = i64, Path, description = "User id"), LimitQuery),
    responses((status = 200, description = "Messages, oldest first", body = Vec<MessageResponse>))
)]
pub async fn list_user_messages(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let messages = state.store.list_user_messages(user_id, query.or(100, 1000)).await?;
    Ok(Json(messages.iter().map(|m| m.to_response()).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/chat/{id}",
    tag = "chat",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Chat history cleared", body = DeletedResponse))
)]
pub async fn clear_user_chat(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<DeletedResponse>, ServerError> {
    state.store.clear_user_chat(user_id).await?;
    info!(user_id, "chat history cleared");
    Ok(Json(DeletedResponse { deleted: true }))
}

#[cfg(test)]
mod test {
    use crate::entities::fixture;
    use crate::routes::test::{app, call};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn first_user_message_titles_the_session() {
        let (app, state) = app().await;
        let user = fixture::user(&state.store, "g-1", "Ada").await;
        let (_, session) = call(&app, Method::POST, "/api/chat/sessions", Some(json!({ "user_id": user.id }))).await;
        assert_eq!(session["title"], "New Chat");

        let long = "x".repeat(120);
        for (role, content) in [("user", long.as_str()), ("assistant", "Sure!")] {
            let body = json!({ "user_id": user.id, "session_id": session["id"], "role": role, "content": content });
            let (status, _) = call(&app, Method::POST, "/api/chat/messages", Some(body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, sessions) = call(&app, Method::GET, &format!("/api/chat/sessions/{}", user.id), None).await;
        assert_eq!(sessions[0]["title"].as_str().unwrap().chars().count(), 80);
        assert_eq!(sessions[0]["message_count"], 2);

        let (_, messages) = call(&app, Method::GET, &format!("/api/chat/messages/{}", session["id"]), None).await;
        assert_eq!(messages[1]["role"], "assistant");
    }

    #[tokio::test]
    async fn rename_delete_and_clear() {
        let (app, state) = app().await;
        let user = fixture::user(&state.store, "g-1", "Ada").await;
        let (_, session) = call(&app, Method::POST, "/api/chat/sessions", Some(json!({ "user_id": user.id }))).await;
        let uri = format!("/api/chat/sessions/{}", session["id"]);

        let (_, renamed) = call(&app, Method::PUT, &uri, Some(json!({ "title": "Lifetimes" }))).await;
        assert_eq!(renamed["title"], "Lifetimes");

        let body = json!({ "user_id": user.id, "session_id": session["id"], "role": "user", "content": "hi" });
        call(&app, Method::POST, "/api/chat/messages", Some(body)).await;
        let (_, legacy) = call(&app, Method::GET, &format!("/api/chat/{}?limit=5", user.id), None).await;
        assert_eq!(legacy.as_array().unwrap().len(), 1);

        let (_, deleted) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(deleted["deleted"], true);
        let (status, _) = call(&app, Method::PUT, &uri, Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::DELETE, &format!("/api/chat/{}", user.id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, legacy) = call(&app, Method::GET, &format!("/api/chat/{}", user.id), None).await;
        assert_eq!(legacy, json!([]));
    }

    #[tokio::test]
    async fn message_to_a_missing_session() {
        let (app, state) = app().await;
        let user = fixture::user(&state.store, "g-1", "Ada").await;
        let body = json!({ "user_id": user.id, "session_id": 77, "role": "user", "content": "hi" });
        let (status, _) = call(&app, Method::POST, "/api/chat/messages", Some(body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
