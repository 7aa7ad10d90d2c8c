use crate::entities::dao::{Room, RoomMember, RoomMessage, RoomSummary};
use crate::entities::{SqliteStore, now, parse_ts};
use std::future::Future;

/// A room message before it has an id.
#[derive(Debug, Clone)]
pub struct NewRoomMessage {
    pub room_id: i64,
    pub user_id: Option<i64>,
    pub sender_name: String,
    pub role: String,
    pub content: String,
    pub persona: Option<String>,
}

pub trait RoomStore: Send + Sync + 'static {
    /// Create a room and make its creator the first member.
    fn create_room(
        &self,
        user_id: i64,
        name: &str,
        invite_code: &str,
    ) -> impl Future<Output = Result<Room, sqlx::Error>> + Send;
    fn get_room(&self, id: i64) -> impl Future<Output = Result<Option<Room>, sqlx::Error>> + Send;
    fn find_room_by_code(&self, code: &str) -> impl Future<Output = Result<Option<Room>, sqlx::Error>> + Send;
    /// `false` when the user already was a member.
    fn add_member(&self, room_id: i64, user_id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    fn set_invite_code(
        &self,
        room_id: i64,
        code: &str,
    ) -> impl Future<Output = Result<Option<Room>, sqlx::Error>> + Send;
    fn list_rooms_for_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<RoomSummary>, sqlx::Error>> + Send;
    /// Earliest joiner first.
    fn list_members(&self, room_id: i64) -> impl Future<Output = Result<Vec<RoomMember>, sqlx::Error>> + Send;
    /// Oldest first; `after` skips everything up to and including that id.
    fn list_room_messages(
        &self,
        room_id: i64,
        after: Option<i64>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<RoomMessage>, sqlx::Error>> + Send;
    /// The last `limit` messages up to and including `until_id`, oldest first.
    fn recent_room_messages(
        &self,
        room_id: i64,
        until_id: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<RoomMessage>, sqlx::Error>> + Send;
    fn post_room_message(
        &self,
        message: NewRoomMessage,
    ) -> impl Future<Output = Result<RoomMessage, sqlx::Error>> + Send;
}

type RoomRow = (i64, String, i64, String, String);
type MessageRow = (i64, i64, Option<i64>, String, String, String, Option<String>, String);

const ROOM_COLUMNS: &str = "id, name, created_by, invite_code, created_at";
const MESSAGE_COLUMNS: &str = "id, room_id, user_id, sender_name, role, content, persona, created_at";

fn room_from_row((id, name, created_by, invite_code, created_at): RoomRow) -> Room {
    Room { id, name, created_by, invite_code, created_at: parse_ts(&created_at) }
}

fn message_from_row(row: MessageRow) -> RoomMessage {
    let (id, room_id, user_id, sender_name, role, content, persona, created_at) = row;
    RoomMessage {
        id,
        room_id,
        user_id,
        sender_name,
        role,
        content,
        persona,
        created_at: parse_ts(&created_at),
    }
}

impl RoomStore for SqliteStore {
    async fn create_room(&self, user_id: i64, name: &str, invite_code: &str) -> Result<Room, sqlx::Error> {
        let ts = now();
        let mut tx = self.pool().begin().await?;
        let row: RoomRow = sqlx::query_as(&format!(
            "INSERT INTO chat_rooms (name, created_by, invite_code, created_at) \
             VALUES (?1, ?2, ?3, ?4) RETURNING {ROOM_COLUMNS}"
        ))
        .bind(name)
        .bind(user_id)
        .bind(invite_code)
        .bind(&ts)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("INSERT OR IGNORE INTO room_members (room_id, user_id, joined_at) VALUES (?1, ?2, ?3)")
            .bind(row.0)
            .bind(user_id)
            .bind(&ts)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(room_from_row(row))
    }

    async fn get_room(&self, id: i64) -> Result<Option<Room>, sqlx::Error> {
        let row: Option<RoomRow> =
            sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = ?1"))
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(room_from_row))
    }

    async fn find_room_by_code(&self, code: &str) -> Result<Option<Room>, sqlx::Error> {
        let row: Option<RoomRow> =
            sqlx::query_as(&format!("SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE invite_code = ?1"))
                .bind(code)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(room_from_row))
    }

    async fn add_member(&self, room_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "INSERT OR IGNORE INTO room_members (room_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(now())
        .execute(self.pool())
        .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn set_invite_code(&self, room_id: i64, code: &str) -> Result<Option<Room>, sqlx::Error> {
        let row: Option<RoomRow> = sqlx::query_as(&format!(
            "UPDATE chat_rooms SET invite_code = ?1 WHERE id = ?2 RETURNING {ROOM_COLUMNS}"
        ))
        .bind(code)
        .bind(room_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(room_from_row))
    }

    async fn list_rooms_for_user(&self, user_id: i64) -> Result<Vec<RoomSummary>, sqlx::Error> {
        let rows: Vec<(i64, String, i64, String, String, String, i64, Option<String>)> = sqlx::query_as(
            "SELECT r.id, r.name, r.created_by, r.invite_code, r.created_at, rm.joined_at, \
               (SELECT COUNT(*) FROM room_members WHERE room_id = r.id), \
               (SELECT content FROM room_messages WHERE room_id = r.id ORDER BY id DESC LIMIT 1) \
             FROM chat_rooms r JOIN room_members rm ON rm.room_id = r.id \
             WHERE rm.user_id = ?1 ORDER BY r.created_at DESC, r.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, name, created_by, invite_code, created_at, joined_at, member_count, last_message)| {
                    RoomSummary {
                        room: room_from_row((id, name, created_by, invite_code, created_at)),
                        joined_at: parse_ts(&joined_at),
                        member_count,
                        last_message,
                    }
                },
            )
            .collect())
    }

    async fn list_members(&self, room_id: i64) -> Result<Vec<RoomMember>, sqlx::Error> {
        let rows: Vec<(i64, String, Option<String>, String)> = sqlx::query_as(
            "SELECT u.id, u.name, u.picture, rm.joined_at \
             FROM room_members rm JOIN users u ON u.id = rm.user_id \
             WHERE rm.room_id = ?1 ORDER BY rm.joined_at ASC, u.id ASC",
        )
        .bind(room_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|(user_id, name, picture, joined_at)| RoomMember {
                user_id,
                name,
                picture,
                joined_at: parse_ts(&joined_at),
            })
            .collect())
    }

    async fn list_room_messages(
        &self,
        room_id: i64,
        after: Option<i64>,
        limit: i64,
    ) -> Result<Vec<RoomMessage>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM room_messages \
             WHERE room_id = ?1 AND id > ?2 ORDER BY id ASC LIMIT ?3"
        ))
        .bind(room_id)
        .bind(after.unwrap_or(0))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn recent_room_messages(
        &self,
        room_id: i64,
        until_id: i64,
        limit: i64,
    ) -> Result<Vec<RoomMessage>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM room_messages \
             WHERE room_id = ?1 AND id <= ?2 ORDER BY id DESC LIMIT ?3"
        ))
        .bind(room_id)
        .bind(until_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().rev().map(message_from_row).collect())
    }

    async fn post_room_message(&self, message: NewRoomMessage) -> Result<RoomMessage, sqlx::Error> {
        let row: MessageRow = sqlx::query_as(&format!(
            "INSERT INTO room_messages (room_id, user_id, sender_name, role, content, persona, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message.room_id)
        .bind(message.user_id)
        .bind(&message.sender_name)
        .bind(&message.role)
        .bind(&message.content)
        .bind(&message.persona)
        .bind(now())
        .fetch_one(self.pool())
        .await?;
        Ok(message_from_row(row))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::fixture;

    fn say(room_id: i64, user_id: i64, content: &str) -> NewRoomMessage {
        NewRoomMessage {
            room_id,
            user_id: Some(user_id),
            sender_name: "Ada".into(),
            role: "user".into(),
            content: content.into(),
            persona: None,
        }
    }

    #[tokio::test]
    async fn creator_is_first_member() {
        let store = fixture::store().await;
        let ada = fixture::user(&store, "g-1", "Ada").await;
        let bob = fixture::user(&store, "g-2", "Bob").await;
        let room = store.create_room(ada.id, "Study group", "ABCDEF12").await.unwrap();

        assert!(store.add_member(room.id, bob.id).await.unwrap());
        assert!(!store.add_member(room.id, bob.id).await.unwrap());

        let members = store.list_members(room.id).await.unwrap();
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Bob"]);

        let found = store.find_room_by_code("ABCDEF12").await.unwrap().unwrap();
        assert_eq!(found.id, room.id);
    }

    #[tokio::test]
    async fn summaries_carry_counts_and_last_message() {
        let store = fixture::store().await;
        let ada = fixture::user(&store, "g-1", "Ada").await;
        let room = store.create_room(ada.id, "Study group", "ABCDEF12").await.unwrap();
        store.post_room_message(say(room.id, ada.id, "first")).await.unwrap();
        store.post_room_message(say(room.id, ada.id, "second")).await.unwrap();

        let rooms = store.list_rooms_for_user(ada.id).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].member_count, 1);
        assert_eq!(rooms[0].last_message.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn polling_after_an_id() {
        let store = fixture::store().await;
        let ada = fixture::user(&store, "g-1", "Ada").await;
        let room = store.create_room(ada.id, "Study group", "ABCDEF12").await.unwrap();
        let mut ids = Vec::new();
        for i in 0..4 {
            ids.push(store.post_room_message(say(room.id, ada.id, &format!("m{i}"))).await.unwrap().id);
        }

        let after = store.list_room_messages(room.id, Some(ids[1]), 100).await.unwrap();
        let contents: Vec<_> = after.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3"]);

        let recent = store.recent_room_messages(room.id, ids[3], 2).await.unwrap();
        assert_eq!(recent[0].content, "m2");
        assert_eq!(recent[1].content, "m3");
        let earlier = store.recent_room_messages(room.id, ids[1], 10).await.unwrap();
        let contents: Vec<_> = earlier.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1"]);

        let page = store.list_room_messages(room.id, None, 1).await.unwrap();
        assert_eq!(page[0].content, "m0");
    }

    #[tokio::test]
    async fn invite_code_can_be_rotated() {
        let store = fixture::store().await;
        let ada = fixture::user(&store, "g-1", "Ada").await;
        let room = store.create_room(ada.id, "Study group", "ABCDEF12").await.unwrap();
        let rotated = store.set_invite_code(room.id, "0011AABB").await.unwrap().unwrap();
        assert_eq!(rotated.invite_code, "0011AABB");
        assert!(store.find_room_by_code("ABCDEF12").await.unwrap().is_none());
        assert!(store.set_invite_code(999, "0011AABC").await.unwrap().is_none());
    }
}
