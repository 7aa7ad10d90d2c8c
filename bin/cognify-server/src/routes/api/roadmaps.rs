use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::entities::{Level, LevelPatch, QuizQuestion, RoadmapStore, Subtopic};
use crate::error::ServerError;
use crate::schemas::DeletedResponse;
use crate::schemas::roadmap::{CreateRoadmapRequest, RoadmapResponse, UpdateLevelRequest};
use crate::services::materialize;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(create_roadmap, list_roadmaps, get_roadmap, delete_roadmap, update_level, get_level),
    components(schemas(
        CreateRoadmapRequest,
        UpdateLevelRequest,
        RoadmapResponse,
        DeletedResponse,
        Level,
        Subtopic,
        QuizQuestion
    ))
)]
pub struct RoadmapsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/roadmaps", post(create_roadmap))
        .route("/roadmaps/user/{id}", get(list_roadmaps))
        .route("/roadmaps/{id}", get(get_roadmap).delete(delete_roadmap))
        .route("/roadmaps/{id}/levels", put(update_level))
        .route("/roadmaps/{id}/levels/{level_id}", get(get_level))
}

/// Store a roadmap; an existing (user, topic) roadmap is returned instead.
#[utoipa::path(
    post,
    path = "/api/roadmaps",
    tag = "roadmaps",
    request_body = CreateRoadmapRequest,
    responses(
        (status = 200, description = "Roadmap stored or already present", body = RoadmapResponse),
        (status = 400, description = "Missing topic"),
    )
)]
pub async fn create_roadmap(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoadmapRequest>,
) -> Result<Json<RoadmapResponse>, ServerError> {
    req.validate()?;
    let (roadmap, existing) = state
        .store
        .create_roadmap(req.user_id, req.client_id.as_deref(), &req.topic, &req.levels)
        .await?;
    info!(roadmap_id = roadmap.id, user_id = ?req.user_id, topic = %req.topic, existing, "roadmap stored");
    Ok(Json(roadmap.to_created_response(existing)))
}

#[utoipa::path(
    get,
    path = "/api/roadmaps/user/{id}",
    tag = "roadmaps",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Roadmaps, newest first", body = Vec<RoadmapResponse>))
)]
pub async fn list_roadmaps(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<RoadmapResponse>>, ServerError> {
    let roadmaps = state.store.list_roadmaps(user_id).await?;
    Ok(Json(roadmaps.iter().map(|r| r.to_response()).collect()))
}

#[utoipa::path(
    get,
    path = "/api/roadmaps/{id}",
    tag = "roadmaps",
    params(("id" = i64, Path, description = "Roadmap id")),
    responses(
        (status = 200, description = "Roadmap found", body = RoadmapResponse),
        (status = 404, description = "Roadmap not found"),
    )
)]
pub async fn get_roadmap(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<RoadmapResponse>, ServerError> {
    let roadmap = state
        .store
        .get_roadmap(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Roadmap not found".into()))?;
    Ok(Json(roadmap.to_response()))
}

/// Delete a roadmap together with every user's progress on it.
#[utoipa::path(
    delete,
    path = "/api/roadmaps/{id}",
    tag = "roadmaps",
    params(("id" = i64, Path, description = "Roadmap id")),
    responses((status = 200, description = "Deletion result", body = DeletedResponse))
)]
pub async fn delete_roadmap(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ServerError> {
    let deleted = state.store.delete_roadmap(id).await?;
    info!(roadmap_id = id, deleted, "roadmap deleted");
    Ok(Json(DeletedResponse { deleted }))
}

#[utoipa::path(
    put,
    path = "/api/roadmaps/{id}/levels",
    tag = "roadmaps",
    params(("id" = i64, Path, description = "Roadmap id")),
    request_body = UpdateLevelRequest,
    responses(
        (status = 200, description = "Updated level", body = Level),
        (status = 404, description = "Roadmap or level not found"),
    )
)]
pub async fn update_level(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLevelRequest>,
) -> Result<Json<Level>, ServerError> {
    req.validate()?;
    let patch = LevelPatch {
        theory_content: req.theory_content,
        subtopics: req.subtopics,
        quiz: req.quiz,
        ..LevelPatch::default()
    };
    let level = state
        .store
        .update_level(id, &req.level_id, patch)
        .await?
        .ok_or_else(|| ServerError::NotFound("Roadmap or level not found".into()))?;
    Ok(Json(level))
}

/// Fetch a level, generating its theory, subtopics and quiz on first view.
#[utoipa::path(
    get,
    path = "/api/roadmaps/{id}/levels/{level_id}",
    tag = "roadmaps",
    params(
        ("id" = i64, Path, description = "Roadmap id"),
        ("level_id" = String, Path, description = "Level id, e.g. `level-1`"),
    ),
    responses(
        (status = 200, description = "Materialised level", body = Level),
        (status = 404, description = "Roadmap or level not found"),
    )
)]
pub async fn get_level(
    State(state): State<Arc<AppState>>,
    Path((id, level_id)): Path<(i64, String)>,
) -> Result<Json<Level>, ServerError> {
    let roadmap = state
        .store
        .get_roadmap(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Roadmap not found".into()))?;
    let level = materialize::materialize_level(&state.store, &state.tutor, &roadmap, &level_id).await?;
    Ok(Json(level))
}
