pub mod ai;
pub mod chat;
pub mod code;
pub mod progress;
pub mod roadmaps;
pub mod rooms;
pub mod users;

use crate::state::AppState;
use utoipa::OpenApi;

use axum::Router;
use std::sync::Arc;

/// Routes nested under `/api`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(users::router())
        .merge(roadmaps::router())
        .merge(progress::router())
        .merge(chat::router())
        .merge(rooms::router())
        .merge(code::router())
        .merge(ai::router())
}

#[derive(OpenApi)]
#[openapi()]
pub struct Api;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut doc = Api::openapi();
    doc.merge(users::UsersApi::openapi());
    doc.merge(roadmaps::RoadmapsApi::openapi());
    doc.merge(progress::ProgressApi::openapi());
    doc.merge(chat::ChatApi::openapi());
    doc.merge(rooms::RoomsApi::openapi());
    doc.merge(code::CodeApi::openapi());
    doc.merge(ai::AiApi::openapi());
    doc
}
