use super::chat::MessageRole;
use crate::entities::{Room, RoomMember, RoomMessage, RoomSummary};
use cognify_llm::Persona;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Body of `POST /api/rooms`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    pub user_id: i64,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
}

/// Body of `POST /api/rooms/join`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    pub user_id: i64,
    #[validate(length(min = 1, message = "invite_code is required"))]
    pub invite_code: String,
}

/// Body of `POST /api/rooms/{id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct PostRoomMessageRequest {
    pub user_id: Option<i64>,
    /// Display name; looked up from `user_id` when omitted.
    pub sender_name: Option<String>,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    /// Defaults to `user`.
    pub role: Option<MessageRole>,
}

/// `GET /api/rooms/{id}/messages` query.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct RoomMessagesQuery {
    /// Only messages with a larger id (polling cursor).
    pub after: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomResponse {
    pub id: i64,
    pub name: String,
    pub created_by: i64,
    pub invite_code: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomSummaryResponse {
    #[serde(flatten)]
    pub room: RoomResponse,
    pub joined_at: String,
    pub member_count: i64,
    pub last_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    /// User id.
    pub id: i64,
    pub name: String,
    pub picture: Option<String>,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomDetailResponse {
    #[serde(flatten)]
    pub room: RoomResponse,
    pub members: Vec<MemberResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomMessageResponse {
    pub id: i64,
    pub room_id: i64,
    pub user_id: Option<i64>,
    pub sender_name: String,
    pub role: String,
    pub content: String,
    /// Persona id for bot replies.
    pub persona: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PersonaResponse {
    pub id: String,
    pub name: String,
    pub tagline: String,
}

impl Room {
    pub fn to_response(&self) -> RoomResponse {
        RoomResponse {
            id: self.id,
            name: self.name.clone(),
            created_by: self.created_by,
            invite_code: self.invite_code.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl RoomSummary {
    pub fn to_response(&self) -> RoomSummaryResponse {
        RoomSummaryResponse {
            room: self.room.to_response(),
            joined_at: self.joined_at.to_rfc3339(),
            member_count: self.member_count,
            last_message: self.last_message.clone(),
        }
    }
}

impl RoomMember {
    pub fn to_response(&self) -> MemberResponse {
        MemberResponse {
            id: self.user_id,
            name: self.name.clone(),
            picture: self.picture.clone(),
            joined_at: self.joined_at.to_rfc3339(),
        }
    }
}

impl RoomMessage {
    pub fn to_response(&self) -> RoomMessageResponse {
        RoomMessageResponse {
            id: self.id,
            room_id: self.room_id,
            user_id: self.user_id,
            sender_name: self.sender_name.clone(),
            role: self.role.clone(),
            content: self.content.clone(),
            persona: self.persona.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl From<&Persona> for PersonaResponse {
    fn from(p: &Persona) -> Self {
        Self { id: p.id.to_owned(), name: p.name.to_owned(), tagline: p.tagline.to_owned() }
    }
}
