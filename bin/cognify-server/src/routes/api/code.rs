use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use cognify_llm::LANGUAGES;
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::entities::CodeHistoryStore;
use crate::error::ServerError;
use crate::schemas::LimitQuery;
use crate::schemas::code::{
    CodeHistoryResponse, ExecuteRequest, ExecutionResponse, LanguageResponse, SaveCodeRequest,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(save_code, list_code, list_languages, execute),
    components(schemas(
        SaveCodeRequest,
        ExecuteRequest,
        CodeHistoryResponse,
        ExecutionResponse,
        LanguageResponse
    ))
)]
pub struct CodeApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/code-history", post(save_code))
        .route("/code-history/{id}", get(list_code))
        .route("/code/languages", get(list_languages))
        .route("/code/execute", post(execute))
}

#[utoipa::path(
    post,
    path = "/api/code-history",
    tag = "code",
    request_body = SaveCodeRequest,
    responses(
        (status = 200, description = "Snippet stored", body = CodeHistoryResponse),
        (status = 400, description = "Missing language or code"),
    )
)]
pub async fn save_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveCodeRequest>,
) -> Result<Json<CodeHistoryResponse>, ServerError> {
    req.validate()?;
    let entry = state
        .store
        .save_code(req.user_id, &req.language, &req.code, &req.stdin, &req.output)
        .await?;
    info!(user_id = req.user_id, language = %req.language, "code saved");
    Ok(Json(entry.to_response()))
}

#[utoipa::path(
    get,
    path = "/api/code-history/{id}",
    tag = "code",
    params(("id" = i64, Path, description = "User id"), LimitQuery),
    responses((status = 200, description = "Snippets, newest first", body = Vec<CodeHistoryResponse>))
)]
pub async fn list_code(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<CodeHistoryResponse>>, ServerError> {
    let entries = state.store.list_code(user_id, query.or(20, 200)).await?;
    Ok(Json(entries.iter().map(|e| e.to_response()).collect()))
}

#[utoipa::path(
    get,
    path = "/api/code/languages",
    tag = "code",
    responses((status = 200, description = "Playground languages", body = Vec<LanguageResponse>))
)]
pub async fn list_languages() -> Json<Vec<LanguageResponse>> {
    Json(LANGUAGES.iter().map(LanguageResponse::from).collect())
}

/// Run a snippet through the code-execution API.
#[utoipa::path(
    post,
    path = "/api/code/execute",
    tag = "code",
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Program output", body = ExecutionResponse),
        (status = 400, description = "Unsupported language"),
        (status = 502, description = "Execution API unreachable"),
    )
)]
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecutionResponse>, ServerError> {
    req.validate()?;
    let result = state.executor.execute(&req.language, &req.code, &req.stdin).await?;
    info!(language = %req.language, exit_code = result.exit_code, "code executed");
    Ok(Json(result.into()))
}

#[cfg(test)]
mod test {
    use crate::entities::fixture;
    use crate::routes::build;
    use crate::routes::test::{app, call};
    use crate::state::AppState;
    use axum::http::{Method, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use cognify_llm::ExecutionClient;
    use serde_json::{Value, json};
    use std::sync::Arc;

    /// A stand-in Piston that echoes the submitted file name and stdin.
    async fn fake_piston() -> String {
        let piston = Router::new().route(
            "/execute",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "language": body["language"],
                    "version": body["version"],
                    "run": {
                        "stdout": format!("{} <- {}", body["files"][0]["name"].as_str().unwrap_or(""), body["stdin"].as_str().unwrap_or("")),
                        "stderr": "",
                        "code": 0,
                        "signal": null
                    }
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, piston).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let (app, state) = app().await;
        let user = fixture::user(&state.store, "g-1", "Ada").await;
        for code in ["print(1)", "print(2)", "print(3)"] {
            let body = json!({ "user_id": user.id, "language": "python", "code": code });
            let (status, _) = call(&app, Method::POST, "/api/code-history", Some(body)).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (_, history) = call(&app, Method::GET, &format!("/api/code-history/{}?limit=2", user.id), None).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["code"], "print(3)");
        assert_eq!(history[0]["stdin"], "");
    }

    #[tokio::test]
    async fn languages_and_web_preview() {
        let (app, _) = app().await;
        let (_, languages) = call(&app, Method::GET, "/api/code/languages", None).await;
        assert_eq!(languages.as_array().unwrap().len(), 15);
        assert!(languages.as_array().unwrap().iter().any(|l| l["id"] == "html" && l["isWeb"] == true));

        let body = json!({ "language": "html", "code": "<h1>hi</h1>" });
        let (status, result) = call(&app, Method::POST, "/api/code/execute", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(result["stdout"].as_str().unwrap().starts_with("[Live Preview]"));

        let body = json!({ "language": "cobol", "code": "DISPLAY 'HI'." });
        let (status, _) = call(&app, Method::POST, "/api/code/execute", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn executes_through_piston() {
        let (_, state) = app().await;
        let state = Arc::new(AppState {
            executor: ExecutionClient::new(fake_piston().await).unwrap(),
            ..(*state).clone()
        });
        let app = build(state);

        let body = json!({ "language": "java", "code": "class Main {}", "stdin": "42" });
        let (status, result) = call(&app, Method::POST, "/api/code/execute", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["stdout"], "Main.java <- 42");
        assert_eq!(result["exitCode"], 0);
    }
}
