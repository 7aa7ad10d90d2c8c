//! Generation endpoints.
//!
//! The `…/stream` routes answer with server-sent events (see
//! [`crate::services::relay`]); the rest return JSON once the model is done.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{info, warn};
use utoipa::OpenApi;
use validator::Validate;

use crate::entities::{ChatStore, RoadmapStore, SqliteStore};
use crate::error::ServerError;
use crate::schemas::ContentResponse;
use crate::schemas::ai::{
    ChatRequest, ChatTurn, CodeAnalysisResponse, CodeRequest, GenerateCodeRequest, GenerateRoadmapRequest,
    HintRequest, LevelContentRequest, QuestionResponse, QuizRequest, RecommendationRequest,
    SubtopicContentRequest, SubtopicOutlineResponse, SubtopicsRequest,
};
use crate::schemas::roadmap::RoadmapResponse;
use crate::services::materialize;
use crate::services::relay::relay;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_roadmap,
        chat,
        chat_stream,
        level_stream,
        subtopic_stream,
        subtopics,
        quiz,
        explain_code,
        code_hint,
        analyze_code,
        generate_code_stream,
        code_insights_stream,
        recommendation
    ),
    components(schemas(
        GenerateRoadmapRequest,
        ChatTurn,
        ChatRequest,
        LevelContentRequest,
        SubtopicContentRequest,
        SubtopicsRequest,
        QuizRequest,
        CodeRequest,
        HintRequest,
        GenerateCodeRequest,
        RecommendationRequest,
        ContentResponse,
        SubtopicOutlineResponse,
        QuestionResponse,
        CodeAnalysisResponse
    ))
)]
pub struct AiApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ai/roadmap", post(generate_roadmap))
        .route("/ai/chat", post(chat))
        .route("/ai/chat/stream", post(chat_stream))
        .route("/ai/level/stream", post(level_stream))
        .route("/ai/subtopic/stream", post(subtopic_stream))
        .route("/ai/subtopics", post(subtopics))
        .route("/ai/quiz", post(quiz))
        .route("/ai/code/explain", post(explain_code))
        .route("/ai/code/hint", post(code_hint))
        .route("/ai/code/analyze", post(analyze_code))
        .route("/ai/code/generate/stream", post(generate_code_stream))
        .route("/ai/code/insights/stream", post(code_insights_stream))
        .route("/ai/recommendation", post(recommendation))
}

async fn store_reply(store: &SqliteStore, user_id: i64, session_id: i64, content: &str) {
    if let Err(e) = store.append_message(user_id, Some(session_id), "assistant", content).await {
        warn!(session_id, error = %e, "failed to store assistant reply");
    }
}

/// Generate a roadmap for a topic and store it; a user's existing roadmap
/// for the same topic is returned without generating.
#[utoipa::path(
    post,
    path = "/api/ai/roadmap",
    tag = "ai",
    request_body = GenerateRoadmapRequest,
    responses(
        (status = 200, description = "Stored roadmap", body = RoadmapResponse),
        (status = 502, description = "Model unavailable or output unusable"),
    )
)]
pub async fn generate_roadmap(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRoadmapRequest>,
) -> Result<Json<RoadmapResponse>, ServerError> {
    req.validate()?;
    let topic = req.topic.trim();
    if let Some(user_id) = req.user_id {
        if let Some(existing) = state.store.find_roadmap_by_topic(user_id, topic).await? {
            return Ok(Json(existing.to_created_response(true)));
        }
    }

    let levels = materialize::levels_for(state.tutor.roadmap(topic).await?);
    info!(topic, levels = levels.len(), "roadmap generated");
    let (roadmap, existing) = state
        .store
        .create_roadmap(req.user_id, req.client_id.as_deref(), topic, &levels)
        .await?;
    Ok(Json(roadmap.to_created_response(existing)))
}

#[utoipa::path(
    post,
    path = "/api/ai/chat",
    tag = "ai",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ContentResponse),
        (status = 502, description = "Model unavailable"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ContentResponse>, ServerError> {
    req.validate()?;
    let content = state.tutor.chat(&req.history(), req.system.as_deref()).await?;
    if let (Some(user_id), Some(session_id)) = (req.user_id, req.session_id) {
        store_reply(&state.store, user_id, session_id, &content).await;
    }
    Ok(Json(ContentResponse { content }))
}

#[utoipa::path(
    post,
    path = "/api/ai/chat/stream",
    tag = "ai",
    request_body = ChatRequest,
    responses((status = 200, description = "Reply as server-sent events", content_type = "text/event-stream", body = String))
)]
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ServerError> {
    req.validate()?;
    let history = req.history();
    Ok(relay(move |mut sink| async move {
        let result = state
            .tutor
            .chat_stream(&history, req.system.as_deref(), &mut |t: &str| sink.push(t))
            .await;
        if let (Ok(content), Some(user_id), Some(session_id)) = (&result, req.user_id, req.session_id) {
            store_reply(&state.store, user_id, session_id, content).await;
        }
        result
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/ai/level/stream",
    tag = "ai",
    request_body = LevelContentRequest,
    responses((status = 200, description = "Theory as server-sent events", content_type = "text/event-stream", body = String))
)]
pub async fn level_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LevelContentRequest>,
) -> Result<Response, ServerError> {
    req.validate()?;
    Ok(relay(move |mut sink| async move {
        let result = state
            .tutor
            .level_content_stream(&req.topic, &req.title, &req.description, &mut |t: &str| sink.push(t))
            .await;
        if let (Ok(content), Some(roadmap_id), Some(level_id)) = (&result, req.roadmap_id, req.level_id.as_deref()) {
            if let Err(e) = materialize::save_theory(&state.store, roadmap_id, level_id, content).await {
                warn!(roadmap_id, level_id, error = %e, "failed to store streamed theory");
            }
        }
        result
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/ai/subtopic/stream",
    tag = "ai",
    request_body = SubtopicContentRequest,
    responses((status = 200, description = "Subtopic text as server-sent events", content_type = "text/event-stream", body = String))
)]
pub async fn subtopic_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubtopicContentRequest>,
) -> Result<Response, ServerError> {
    req.validate()?;
    Ok(relay(move |mut sink| async move {
        let result = state
            .tutor
            .subtopic_content_stream(
                &req.topic,
                &req.level_title,
                &req.subtopic_title,
                &req.description,
                &mut |t: &str| sink.push(t),
            )
            .await;
        if let (Ok(content), Some(roadmap_id), Some(level_id), Some(subtopic_id)) =
            (&result, req.roadmap_id, req.level_id.as_deref(), req.subtopic_id.as_deref())
        {
            if let Err(e) =
                materialize::save_subtopic_content(&state.store, roadmap_id, level_id, subtopic_id, content).await
            {
                warn!(roadmap_id, level_id, subtopic_id, error = %e, "failed to store streamed subtopic");
            }
        }
        result
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/ai/subtopics",
    tag = "ai",
    request_body = SubtopicsRequest,
    responses((status = 200, description = "Subtopic outlines", body = Vec<SubtopicOutlineResponse>))
)]
pub async fn subtopics(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubtopicsRequest>,
) -> Result<Json<Vec<SubtopicOutlineResponse>>, ServerError> {
    req.validate()?;
    let outlines = state.tutor.subtopics(&req.topic, &req.title, &req.description).await?;
    Ok(Json(outlines.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/ai/quiz",
    tag = "ai",
    request_body = QuizRequest,
    responses((status = 200, description = "Quiz questions", body = Vec<QuestionResponse>))
)]
pub async fn quiz(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuizRequest>,
) -> Result<Json<Vec<QuestionResponse>>, ServerError> {
    req.validate()?;
    let questions = state.tutor.quiz(&req.topic, &req.title).await?;
    Ok(Json(questions.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/ai/code/explain",
    tag = "ai",
    request_body = CodeRequest,
    responses((status = 200, description = "Explanation", body = ContentResponse))
)]
pub async fn explain_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CodeRequest>,
) -> Result<Json<ContentResponse>, ServerError> {
    req.validate()?;
    let content = state.tutor.explain_code(&req.code, &req.language).await?;
    Ok(Json(ContentResponse { content }))
}

#[utoipa::path(
    post,
    path = "/api/ai/code/hint",
    tag = "ai",
    request_body = HintRequest,
    responses((status = 200, description = "Debugging hint", body = ContentResponse))
)]
pub async fn code_hint(
    State(state): State<Arc<AppState>>,
    Json(req): Json<HintRequest>,
) -> Result<Json<ContentResponse>, ServerError> {
    req.validate()?;
    let content = state.tutor.hint(&req.code, &req.error).await?;
    Ok(Json(ContentResponse { content }))
}

/// Readability and efficiency scores; unparseable output scores zero.
#[utoipa::path(
    post,
    path = "/api/ai/code/analyze",
    tag = "ai",
    request_body = CodeRequest,
    responses((status = 200, description = "Code scores", body = CodeAnalysisResponse))
)]
pub async fn analyze_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CodeRequest>,
) -> Result<Json<CodeAnalysisResponse>, ServerError> {
    req.validate()?;
    let analysis = state.tutor.analyze_code(&req.code).await?;
    Ok(Json(analysis.into()))
}

#[utoipa::path(
    post,
    path = "/api/ai/code/generate/stream",
    tag = "ai",
    request_body = GenerateCodeRequest,
    responses((status = 200, description = "Code as server-sent events", content_type = "text/event-stream", body = String))
)]
pub async fn generate_code_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateCodeRequest>,
) -> Result<Response, ServerError> {
    req.validate()?;
    Ok(relay(move |mut sink| async move {
        state
            .tutor
            .generate_code_stream(&req.prompt, &req.language, &mut |t: &str| sink.push(t))
            .await
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/ai/code/insights/stream",
    tag = "ai",
    request_body = CodeRequest,
    responses((status = 200, description = "Review as server-sent events", content_type = "text/event-stream", body = String))
)]
pub async fn code_insights_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CodeRequest>,
) -> Result<Response, ServerError> {
    req.validate()?;
    Ok(relay(move |mut sink| async move {
        state
            .tutor
            .code_insights_stream(&req.code, &req.language, &mut |t: &str| sink.push(t))
            .await
    })
    .into_response())
}

#[utoipa::path(
    post,
    path = "/api/ai/recommendation",
    tag = "ai",
    request_body = RecommendationRequest,
    responses((status = 200, description = "What to learn next", body = ContentResponse))
)]
pub async fn recommendation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecommendationRequest>,
) -> Result<Json<ContentResponse>, ServerError> {
    let content = state.tutor.recommend(req.xp, &req.completed_topics).await?;
    Ok(Json(ContentResponse { content }))
}
