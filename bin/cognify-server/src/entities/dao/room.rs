use chrono::{DateTime, Utc};

/// A row in the `chat_rooms` table.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub created_by: i64,
    /// 8 upper-case hex characters.
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
}

/// A room as seen from one member's room list.
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub room: Room,
    pub joined_at: DateTime<Utc>,
    pub member_count: i64,
    pub last_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RoomMember {
    pub user_id: i64,
    pub name: String,
    pub picture: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// A single row in the `room_messages` table.
#[derive(Debug, Clone)]
pub struct RoomMessage {
    pub id: i64,
    pub room_id: i64,
    /// `None` for persona replies.
    pub user_id: Option<i64>,
    pub sender_name: String,
    /// `"user"`, `"assistant"`, or `"system"`.
    pub role: String,
    pub content: String,
    /// Persona id for bot-authored messages.
    pub persona: Option<String>,
    pub created_at: DateTime<Utc>,
}
