use chrono::{DateTime, Utc};

/// A row in the `chat_sessions` table.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A session as listed in the sidebar.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session: ChatSession,
    pub message_count: i64,
    /// Content of the earliest user message.
    pub first_message: Option<String>,
}

/// A single message row in the `chat_messages` table.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: i64,
    /// `None` for messages saved through the legacy per-user endpoint.
    pub session_id: Option<i64>,
    /// `"user"`, `"assistant"`, or `"system"`.
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
