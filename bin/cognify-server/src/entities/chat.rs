use crate::entities::dao::{ChatMessage, ChatSession, SessionSummary};
use crate::entities::{SqliteStore, now, parse_ts};
use std::future::Future;

/// Title of a session nobody has written in yet.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Auto-titles are cut to this many characters.
const TITLE_CHARS: usize = 80;

pub trait ChatStore: Send + Sync + 'static {
    fn create_session(
        &self,
        user_id: i64,
        title: Option<&str>,
    ) -> impl Future<Output = Result<ChatSession, sqlx::Error>> + Send;
    fn get_session(&self, id: i64) -> impl Future<Output = Result<Option<ChatSession>, sqlx::Error>> + Send;
    /// Most recently active first.
    fn list_sessions(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<SessionSummary>, sqlx::Error>> + Send;
    fn rename_session(
        &self,
        id: i64,
        title: &str,
    ) -> impl Future<Output = Result<Option<ChatSession>, sqlx::Error>> + Send;
    /// Messages go with it.
    fn delete_session(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// Store a message, bump the session and give a "New Chat" session the
    /// first user message as its title.
    fn append_message(
        &self,
        user_id: i64,
        session_id: Option<i64>,
        role: &str,
        content: &str,
    ) -> impl Future<Output = Result<ChatMessage, sqlx::Error>> + Send;
    fn list_messages(
        &self,
        session_id: i64,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;
    /// Oldest first across all sessions.
    fn list_user_messages(
        &self,
        user_id: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;
    fn clear_user_chat(&self, user_id: i64) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

type SessionRow = (i64, i64, String, String, String);
type MessageRow = (i64, i64, Option<i64>, String, String, String);

const MESSAGE_COLUMNS: &str = "id, user_id, session_id, role, content, created_at";

fn session_from_row((id, user_id, title, created_at, updated_at): SessionRow) -> ChatSession {
    ChatSession {
        id,
        user_id,
        title,
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    }
}

fn message_from_row((id, user_id, session_id, role, content, created_at): MessageRow) -> ChatMessage {
    ChatMessage { id, user_id, session_id, role, content, created_at: parse_ts(&created_at) }
}

fn auto_title(content: &str) -> String {
    content.chars().take(TITLE_CHARS).collect()
}

impl ChatStore for SqliteStore {
    async fn create_session(&self, user_id: i64, title: Option<&str>) -> Result<ChatSession, sqlx::Error> {
        let ts = now();
        let title = title.filter(|t| !t.trim().is_empty()).unwrap_or(DEFAULT_TITLE);
        let row: SessionRow = sqlx::query_as(
            "INSERT INTO chat_sessions (user_id, title, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?3) RETURNING id, user_id, title, created_at, updated_at",
        )
        .bind(user_id)
        .bind(title)
        .bind(&ts)
        .fetch_one(self.pool())
        .await?;
        Ok(session_from_row(row))
    }

    async fn get_session(&self, id: i64) -> Result<Option<ChatSession>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, user_id, title, created_at, updated_at FROM chat_sessions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(session_from_row))
    }

    async fn list_sessions(&self, user_id: i64) -> Result<Vec<SessionSummary>, sqlx::Error> {
        let rows: Vec<(i64, i64, String, String, String, i64, Option<String>)> = sqlx::query_as(
            "SELECT s.id, s.user_id, s.title, s.created_at, s.updated_at, \
               (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.id), \
               (SELECT m.content FROM chat_messages m \
                  WHERE m.session_id = s.id AND m.role = 'user' ORDER BY m.id ASC LIMIT 1) \
             FROM chat_sessions s WHERE s.user_id = ?1 \
             ORDER BY s.updated_at DESC, s.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, user_id, title, created_at, updated_at, message_count, first_message)| {
                SessionSummary {
                    session: session_from_row((id, user_id, title, created_at, updated_at)),
                    message_count,
                    first_message,
                }
            })
            .collect())
    }

    async fn rename_session(&self, id: i64, title: &str) -> Result<Option<ChatSession>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(
            "UPDATE chat_sessions SET title = ?1, updated_at = ?2 WHERE id = ?3 \
             RETURNING id, user_id, title, created_at, updated_at",
        )
        .bind(title)
        .bind(now())
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(session_from_row))
    }

    async fn delete_session(&self, id: i64) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("DELETE FROM chat_sessions WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn append_message(
        &self,
        user_id: i64,
        session_id: Option<i64>,
        role: &str,
        content: &str,
    ) -> Result<ChatMessage, sqlx::Error> {
        let ts = now();
        let mut tx = self.pool().begin().await?;
        let row: MessageRow = sqlx::query_as(&format!(
            "INSERT INTO chat_messages (user_id, session_id, role, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(session_id)
        .bind(role)
        .bind(content)
        .bind(&ts)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(session_id) = session_id {
            sqlx::query("UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2")
                .bind(&ts)
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
            if role == "user" {
                sqlx::query("UPDATE chat_sessions SET title = ?1 WHERE id = ?2 AND title = ?3")
                    .bind(auto_title(content))
                    .bind(session_id)
                    .bind(DEFAULT_TITLE)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        Ok(message_from_row(row))
    }

    async fn list_messages(&self, session_id: i64) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE session_id = ?1 ORDER BY id ASC"
        ))
        .bind(session_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn list_user_messages(&self, user_id: i64, limit: i64) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE user_id = ?1 ORDER BY id ASC LIMIT ?2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn clear_user_chat(&self, user_id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM chat_sessions WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chat_messages WHERE user_id = ?1 AND session_id IS NULL")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
