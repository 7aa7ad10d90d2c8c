use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use cognify_llm::PERSONAS;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{NewRoomMessage, RoomStore, UserStore};
use crate::error::ServerError;
use crate::schemas::chat::MessageRole;
use crate::schemas::room::{
    CreateRoomRequest, JoinRoomRequest, MemberResponse, PersonaResponse, PostRoomMessageRequest,
    RoomDetailResponse, RoomMessageResponse, RoomMessagesQuery, RoomResponse, RoomSummaryResponse,
};
use crate::services::dispatcher;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_room,
        join_room,
        regenerate_code,
        list_rooms,
        get_room,
        list_messages,
        post_message,
        list_personas
    ),
    components(schemas(
        CreateRoomRequest,
        JoinRoomRequest,
        PostRoomMessageRequest,
        RoomResponse,
        RoomSummaryResponse,
        RoomDetailResponse,
        MemberResponse,
        RoomMessageResponse,
        PersonaResponse
    ))
)]
pub struct RoomsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/join", post(join_room))
        .route("/rooms/personas", get(list_personas))
        .route("/rooms/user/{id}", get(list_rooms))
        .route("/rooms/{id}", get(get_room))
        .route("/rooms/{id}/regenerate-code", post(regenerate_code))
        .route("/rooms/{id}/messages", get(list_messages).post(post_message))
}

/// Eight upper-case hex characters.
fn invite_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

#[utoipa::path(
    post,
    path = "/api/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created; the creator is its first member", body = RoomResponse),
        (status = 400, description = "Missing name"),
    )
)]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<RoomResponse>, ServerError> {
    req.validate()?;
    let room = state.store.create_room(req.user_id, req.name.trim(), &invite_code()).await?;
    info!(room_id = room.id, user_id = req.user_id, invite_code = %room.invite_code, "room created");
    Ok(Json(room.to_response()))
}

/// Join by invite code and announce the newcomer.
#[utoipa::path(
    post,
    path = "/api/rooms/join",
    tag = "rooms",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined room", body = RoomResponse),
        (status = 404, description = "Invalid invite code"),
    )
)]
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<RoomResponse>, ServerError> {
    req.validate()?;
    let room = state
        .store
        .find_room_by_code(&req.invite_code.trim().to_uppercase())
        .await?
        .ok_or_else(|| ServerError::NotFound("Invalid invite code".into()))?;
    let added = state.store.add_member(room.id, req.user_id).await?;

    let name = state
        .store
        .get_user(req.user_id)
        .await?
        .map(|u| u.name)
        .unwrap_or_else(|| "Someone".to_owned());
    state
        .store
        .post_room_message(NewRoomMessage {
            room_id: room.id,
            user_id: Some(req.user_id),
            sender_name: "System".into(),
            role: MessageRole::System.to_string(),
            content: format!("{name} joined the room"),
            persona: None,
        })
        .await?;
    info!(room_id = room.id, user_id = req.user_id, new_member = added, "room joined");
    Ok(Json(room.to_response()))
}

#[utoipa::path(
    post,
    path = "/api/rooms/{id}/regenerate-code",
    tag = "rooms",
    params(("id" = i64, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room with its new invite code", body = RoomResponse),
        (status = 404, description = "Room not found"),
    )
)]
pub async fn regenerate_code(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<RoomResponse>, ServerError> {
    let room = state
        .store
        .set_invite_code(id, &invite_code())
        .await?
        .ok_or_else(|| ServerError::NotFound("Room not found".into()))?;
    info!(room_id = id, invite_code = %room.invite_code, "invite code regenerated");
    Ok(Json(room.to_response()))
}

#[utoipa::path(
    get,
    path = "/api/rooms/user/{id}",
    tag = "rooms",
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, description = "Rooms the user belongs to", body = Vec<RoomSummaryResponse>))
)]
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<RoomSummaryResponse>>, ServerError> {
    let rooms = state.store.list_rooms_for_user(user_id).await?;
    Ok(Json(rooms.iter().map(|r| r.to_response()).collect()))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{id}",
    tag = "rooms",
    params(("id" = i64, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room with its members", body = RoomDetailResponse),
        (status = 404, description = "Room not found"),
    )
)]
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<RoomDetailResponse>, ServerError> {
    let room = state
        .store
        .get_room(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Room not found".into()))?;
    let members = state.store.list_members(id).await?;
    Ok(Json(RoomDetailResponse {
        room: room.to_response(),
        members: members.iter().map(|m| m.to_response()).collect(),
    }))
}

/// Poll a room; pass the last seen id as `after`.
#[utoipa::path(
    get,
    path = "/api/rooms/{id}/messages",
    tag = "rooms",
    params(("id" = i64, Path, description = "Room id"), RoomMessagesQuery),
    responses((status = 200, description = "Messages, oldest first", body = Vec<RoomMessageResponse>))
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<RoomMessagesQuery>,
) -> Result<Json<Vec<RoomMessageResponse>>, ServerError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let messages = state.store.list_room_messages(id, query.after, limit).await?;
    Ok(Json(messages.iter().map(|m| m.to_response()).collect()))
}

/// Post a message; `@Persona` mentions in a user message are answered in
/// the background.
#[utoipa::path(
    post,
    path = "/api/rooms/{id}/messages",
    tag = "rooms",
    params(("id" = i64, Path, description = "Room id")),
    request_body = PostRoomMessageRequest,
    responses(
        (status = 200, description = "Stored message", body = RoomMessageResponse),
        (status = 404, description = "Room not found"),
    )
)]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<PostRoomMessageRequest>,
) -> Result<Json<RoomMessageResponse>, ServerError> {
    req.validate()?;
    state
        .store
        .get_room(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Room not found".into()))?;

    let sender_name = match (req.sender_name.filter(|n| !n.trim().is_empty()), req.user_id) {
        (Some(name), _) => name,
        (None, Some(user_id)) => state
            .store
            .get_user(user_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| "Anonymous".to_owned()),
        (None, None) => "Anonymous".to_owned(),
    };
    let role = req.role.unwrap_or(MessageRole::User);
    let message = state
        .store
        .post_room_message(NewRoomMessage {
            room_id: id,
            user_id: req.user_id,
            sender_name,
            role: role.to_string(),
            content: req.content,
            persona: None,
        })
        .await?;
    info!(room_id = id, message_id = message.id, role = %role, "room message posted");

    if role == MessageRole::User {
        dispatcher::spawn_dispatch(state.clone(), message.clone());
    }
    Ok(Json(message.to_response()))
}

#[utoipa::path(
    get,
    path = "/api/rooms/personas",
    tag = "rooms",
    responses((status = 200, description = "Personas that answer @mentions", body = Vec<PersonaResponse>))
)]
pub async fn list_personas() -> Json<Vec<PersonaResponse>> {
    Json(PERSONAS.iter().map(PersonaResponse::from).collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::fixture;
    use crate::routes::test::{app, app_with, call};
    use crate::state::test::ScriptedModel;
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};
    use std::time::Duration;

    #[test]
    fn invite_codes_are_eight_hex_chars() {
        let code = invite_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn create_join_and_inspect() {
        let (app, state) = app().await;
        let ada = fixture::user(&state.store, "g-1", "Ada").await;
        let bob = fixture::user(&state.store, "g-2", "Bob").await;

        let (status, room) =
            call(&app, Method::POST, "/api/rooms", Some(json!({ "user_id": ada.id, "name": "Study group" }))).await;
        assert_eq!(status, StatusCode::OK);
        let code = room["invite_code"].as_str().unwrap().to_lowercase();

        let join = json!({ "user_id": bob.id, "invite_code": code });
        let (status, joined) = call(&app, Method::POST, "/api/rooms/join", Some(join)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(joined["id"], room["id"]);

        let (_, detail) = call(&app, Method::GET, &format!("/api/rooms/{}", room["id"]), None).await;
        let names: Vec<_> = detail["members"].as_array().unwrap().iter().map(|m| m["name"].clone()).collect();
        assert_eq!(names, vec![json!("Ada"), json!("Bob")]);

        let (_, feed) = call(&app, Method::GET, &format!("/api/rooms/{}/messages", room["id"]), None).await;
        assert_eq!(feed[0]["role"], "system");
        assert_eq!(feed[0]["content"], "Bob joined the room");

        let (_, rooms) = call(&app, Method::GET, &format!("/api/rooms/user/{}", bob.id), None).await;
        assert_eq!(rooms[0]["member_count"], 2);
        assert_eq!(rooms[0]["last_message"], "Bob joined the room");
    }

    #[tokio::test]
    async fn bad_codes_and_missing_rooms() {
        let (app, state) = app().await;
        let ada = fixture::user(&state.store, "g-1", "Ada").await;
        let join = json!({ "user_id": ada.id, "invite_code": "NOPE0000" });
        let (status, body) = call(&app, Method::POST, "/api/rooms/join", Some(join)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Invalid invite code");

        let (status, _) = call(&app, Method::POST, "/api/rooms/42/regenerate-code", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) =
            call(&app, Method::POST, "/api/rooms/42/messages", Some(json!({ "content": "hi" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn regenerated_code_replaces_the_old_one() {
        let (app, state) = app().await;
        let ada = fixture::user(&state.store, "g-1", "Ada").await;
        let (_, room) = call(&app, Method::POST, "/api/rooms", Some(json!({ "user_id": ada.id, "name": "R" }))).await;
        let (_, fresh) =
            call(&app, Method::POST, &format!("/api/rooms/{}/regenerate-code", room["id"]), None).await;
        assert_ne!(fresh["invite_code"], room["invite_code"]);

        let join = json!({ "user_id": ada.id, "invite_code": room["invite_code"] });
        let (status, _) = call(&app, Method::POST, "/api/rooms/join", Some(join)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    async fn wait_for_messages(app: &axum::Router, uri: &str, count: usize) -> Value {
        for _ in 0..100 {
            let (_, feed) = call(app, Method::GET, uri, None).await;
            if feed.as_array().map_or(0, Vec::len) >= count {
                return feed;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("room never reached {count} messages");
    }

    #[tokio::test]
    async fn mentions_are_answered_in_the_background() {
        let model = ScriptedModel::new(&["Socrates here.", "Feynman here."]);
        let (app, state) = app_with(model).await;
        let ada = fixture::user(&state.store, "g-1", "Ada").await;
        let (_, room) = call(&app, Method::POST, "/api/rooms", Some(json!({ "user_id": ada.id, "name": "R" }))).await;
        let uri = format!("/api/rooms/{}/messages", room["id"]);

        let (status, posted) =
            call(&app, Method::POST, &uri, Some(json!({ "user_id": ada.id, "content": "@feynman @Socrates why?" })))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(posted["sender_name"], "Ada");

        let feed = wait_for_messages(&app, &format!("{uri}?after={}", posted["id"]), 2).await;
        assert_eq!(feed[0]["sender_name"], "Socrates");
        assert_eq!(feed[0]["persona"], "socrates");
        assert_eq!(feed[1]["sender_name"], "Feynman");
        assert_eq!(feed[1]["content"], "Feynman here.");
    }

    #[tokio::test]
    async fn personas_are_listed() {
        let (app, _) = app().await;
        let (_, personas) = call(&app, Method::GET, "/api/rooms/personas", None).await;
        assert_eq!(personas.as_array().unwrap().len(), PERSONAS.len());
        assert_eq!(personas[0]["id"], PERSONAS[0].id);
    }
}
