use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::entities::{Progress, ProgressStore, QuizResult};
use crate::error::ServerError;
use crate::schemas::progress::{
    CompleteLevelRequest, LedgerResponse, ProgressResponse, QuizSubmissionResponse, SaveProgressRequest,
    SubmitQuizRequest,
};
use crate::services::ledger;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(save_progress, get_progress, list_progress, complete_level, submit_quiz),
    components(schemas(
        SaveProgressRequest,
        CompleteLevelRequest,
        SubmitQuizRequest,
        ProgressResponse,
        LedgerResponse,
        QuizSubmissionResponse,
        QuizResult
    ))
)]
pub struct ProgressApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/progress", put(save_progress))
        .route("/progress/levels/complete", post(complete_level))
        .route("/progress/quiz", post(submit_quiz))
        .route("/progress/{user_id}", get(list_progress))
        .route("/progress/{user_id}/{roadmap_id}", get(get_progress))
}

/// Overwrite stored progress; lists left out of the body keep their value.
#[utoipa::path(
    put,
    path = "/api/progress",
    tag = "progress",
    request_body = SaveProgressRequest,
    responses((status = 200, description = "Progress saved", body = ProgressResponse))
)]
pub async fn save_progress(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveProgressRequest>,
) -> Result<Json<ProgressResponse>, ServerError> {
    let mut progress = state
        .store
        .get_progress(req.user_id, req.roadmap_id)
        .await?
        .unwrap_or_else(|| Progress::empty(req.user_id, req.roadmap_id));
    if let Some(levels) = req.completed_levels {
        progress.completed_levels = levels;
    }
    if let Some(results) = req.quiz_results {
        progress.quiz_results = results;
    }
    info!(user_id = req.user_id, roadmap_id = req.roadmap_id, "progress saved");
    let saved = state.store.save_progress(&progress).await?;
    Ok(Json(saved.to_response()))
}

/// Progress of one user on one roadmap, `null` when not started.
#[utoipa::path(
    get,
    path = "/api/progress/{user_id}/{roadmap_id}",
    tag = "progress",
    params(
        ("user_id" = i64, Path, description = "User id"),
        ("roadmap_id" = i64, Path, description = "Roadmap id"),
    ),
    responses((status = 200, description = "Progress or null", body = Option<ProgressResponse>))
)]
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((user_id, roadmap_id)): Path<(i64, i64)>,
) -> Result<Json<Option<ProgressResponse>>, ServerError> {
    let progress = state.store.get_progress(user_id, roadmap_id).await?;
    Ok(Json(progress.map(|p| p.to_response())))
}

#[utoipa::path(
    get,
    path = "/api/progress/{user_id}",
    tag = "progress",
    params(("user_id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Progress on every roadmap", body = Vec<ProgressResponse>))
)]
pub async fn list_progress(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<ProgressResponse>>, ServerError> {
    let progress = state.store.list_progress(user_id).await?;
    Ok(Json(progress.iter().map(|p| p.to_response()).collect()))
}

/// Complete a level and credit its XP once.
#[utoipa::path(
    post,
    path = "/api/progress/levels/complete",
    tag = "progress",
    request_body = CompleteLevelRequest,
    responses(
        (status = 200, description = "Updated ledger", body = LedgerResponse),
        (status = 404, description = "User, roadmap or level not found"),
    )
)]
pub async fn complete_level(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompleteLevelRequest>,
) -> Result<Json<LedgerResponse>, ServerError> {
    req.validate()?;
    let outcome = ledger::complete_level(&state.store, req.user_id, req.roadmap_id, &req.level_id).await?;
    Ok(Json(outcome.to_response()))
}

/// Grade a quiz, record the result and complete the level.
#[utoipa::path(
    post,
    path = "/api/progress/quiz",
    tag = "progress",
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "Graded submission", body = QuizSubmissionResponse),
        (status = 400, description = "Level has no quiz yet"),
        (status = 404, description = "User, roadmap or level not found"),
    )
)]
pub async fn submit_quiz(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<Json<QuizSubmissionResponse>, ServerError> {
    req.validate()?;
    let outcome =
        ledger::submit_quiz(&state.store, req.user_id, req.roadmap_id, &req.level_id, &req.answers).await?;
    Ok(Json(outcome.to_response()))
}
