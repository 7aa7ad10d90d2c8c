use crate::entities::{ChatMessage, ChatSession, SessionSummary};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use utoipa::ToSchema;
use validator::Validate;

/// Author of a stored chat or room message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Body of `POST /api/chat/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub user_id: i64,
    /// Defaults to "New Chat"; the first user message then names the session.
    pub title: Option<String>,
}

/// Body of `PUT /api/chat/sessions/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RenameSessionRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
}

/// Body of `POST /api/chat/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SaveMessageRequest {
    pub user_id: i64,
    /// Omitted only by legacy clients that predate sessions.
    pub session_id: Option<i64>,
    pub role: MessageRole,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionSummaryResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub message_count: i64,
    pub first_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: i64,
    pub user_id: i64,
    pub session_id: Option<i64>,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl ChatSession {
    pub fn to_response(&self) -> SessionResponse {
        SessionResponse {
            id: self.id,
            user_id: self.user_id,
            title: self.title.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

impl SessionSummary {
    pub fn to_response(&self) -> SessionSummaryResponse {
        SessionSummaryResponse {
            session: self.session.to_response(),
            message_count: self.message_count,
            first_message: self.first_message.clone(),
        }
    }
}

impl ChatMessage {
    pub fn to_response(&self) -> MessageResponse {
        MessageResponse {
            id: self.id,
            user_id: self.user_id,
            session_id: self.session_id,
            role: self.role.clone(),
            content: self.content.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
