use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use strum::IntoEnumIterator;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::entities::UserStore;
use crate::error::ServerError;
use crate::schemas::LimitQuery;
use crate::schemas::user::{RewardResponse, UpdateXpRequest, UpsertUserRequest, UserResponse};
use crate::services::ledger::Reward;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(upsert_user, get_user, update_xp, leaderboard, list_rewards),
    components(schemas(UpsertUserRequest, UpdateXpRequest, UserResponse, RewardResponse))
)]
pub struct UsersApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/upsert", post(upsert_user))
        .route("/users/leaderboard", get(leaderboard))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/xp", put(update_xp))
        .route("/rewards", get(list_rewards))
}

#[utoipa::path(
    post,
    path = "/api/users/upsert",
    tag = "users",
    request_body = UpsertUserRequest,
    responses(
        (status = 200, description = "User created or refreshed", body = UserResponse),
        (status = 400, description = "Missing google_id or name"),
    )
)]
pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpsertUserRequest>,
) -> Result<Json<UserResponse>, ServerError> {
    req.validate()?;
    let user = state
        .store
        .upsert_user(&req.google_id, &req.name, req.email.as_deref(), req.picture.as_deref())
        .await?;
    info!(user_id = user.id, "user upserted");
    Ok(Json(user.to_response()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "Google account id")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found"),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(google_id): Path<String>,
) -> Result<Json<UserResponse>, ServerError> {
    let user = state
        .store
        .get_user_by_google_id(&google_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".into()))?;
    Ok(Json(user.to_response()))
}

/// Overwrite a user's XP total (and rewards when given).
#[utoipa::path(
    put,
    path = "/api/users/{id}/xp",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateXpRequest,
    responses(
        (status = 200, description = "XP updated", body = UserResponse),
        (status = 404, description = "User not found"),
    )
)]
pub async fn update_xp(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateXpRequest>,
) -> Result<Json<UserResponse>, ServerError> {
    req.validate()?;
    let rewards = match req.rewards {
        Some(rewards) => rewards,
        None => {
            state
                .store
                .get_user(id)
                .await?
                .ok_or_else(|| ServerError::NotFound("User not found".into()))?
                .rewards
        }
    };
    info!(user_id = id, xp = req.xp, "xp updated");
    let user = state
        .store
        .update_user_xp(id, req.xp, &rewards)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".into()))?;
    Ok(Json(user.to_response()))
}

#[utoipa::path(
    get,
    path = "/api/users/leaderboard",
    tag = "users",
    params(LimitQuery),
    responses((status = 200, description = "Users by XP, highest first", body = Vec<UserResponse>))
)]
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<UserResponse>>, ServerError> {
    let users = state.store.leaderboard(query.or(10, 100)).await?;
    Ok(Json(users.iter().map(|u| u.to_response()).collect()))
}

#[utoipa::path(
    get,
    path = "/api/rewards",
    tag = "users",
    responses((status = 200, description = "Reward catalogue", body = Vec<RewardResponse>))
)]
pub async fn list_rewards() -> Json<Vec<RewardResponse>> {
    Json(Reward::iter().map(Reward::to_response).collect())
}

#[cfg(test)]
mod test {
    use crate::routes::test::{app, call};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn upsert_then_fetch_by_google_id() {
        let (app, _) = app().await;
        let body = json!({ "google_id": "g-42", "name": "Ada", "email": "ada@example.com" });
        let (status, created) = call(&app, Method::POST, "/api/users/upsert", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["xp"], 0);
        assert_eq!(created["rank"], "Beginner");

        let renamed = json!({ "google_id": "g-42", "name": "Ada L." });
        let (_, again) = call(&app, Method::POST, "/api/users/upsert", Some(renamed)).await;
        assert_eq!(again["id"], created["id"]);

        let (status, fetched) = call(&app, Method::GET, "/api/users/g-42", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Ada L.");
    }

    #[tokio::test]
    async fn missing_fields_and_unknown_users() {
        let (app, _) = app().await;
        let (status, body) =
            call(&app, Method::POST, "/api/users/upsert", Some(json!({ "google_id": "", "name": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("google_id"));

        let (status, _) = call(&app, Method::GET, "/api/users/nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::PUT, "/api/users/99/xp", Some(json!({ "xp": 10 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn xp_update_and_leaderboard() {
        let (app, _) = app().await;
        for (gid, name) in [("g-1", "Ada"), ("g-2", "Bob")] {
            call(&app, Method::POST, "/api/users/upsert", Some(json!({ "google_id": gid, "name": name }))).await;
        }
        let (status, bob) = call(
            &app,
            Method::PUT,
            "/api/users/2/xp",
            Some(json!({ "xp": 1200, "rewards": ["xp-500", "xp-1000"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bob["level"], 7);
        assert_eq!(bob["rank"], "Knowledge Seeker");

        let (_, board) = call(&app, Method::GET, "/api/users/leaderboard?limit=1", None).await;
        assert_eq!(board.as_array().unwrap().len(), 1);
        assert_eq!(board[0]["name"], "Bob");
    }

    #[tokio::test]
    async fn reward_catalogue() {
        let (app, _) = app().await;
        let (_, rewards) = call(&app, Method::GET, "/api/rewards", None).await;
        let rewards = rewards.as_array().unwrap();
        assert_eq!(rewards.len(), 8);
        assert_eq!(rewards[0]["id"], "first-quiz");
    }
}
