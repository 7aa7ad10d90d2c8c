use crate::entities::{SqliteStore, dao::User, from_json, now, parse_ts, to_json};
use sqlx::SqliteExecutor;
use std::future::Future;

pub trait UserStore: Send + Sync + 'static {
    /// Insert a user or refresh the profile fields of an existing `google_id`.
    fn upsert_user(
        &self,
        google_id: &str,
        name: &str,
        email: Option<&str>,
        picture: Option<&str>,
    ) -> impl Future<Output = Result<User, sqlx::Error>> + Send;
    fn get_user(&self, id: i64) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    fn get_user_by_google_id(
        &self,
        google_id: &str,
    ) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    fn update_user_xp(
        &self,
        id: i64,
        xp: i64,
        rewards: &[String],
    ) -> impl Future<Output = Result<Option<User>, sqlx::Error>> + Send;
    /// Highest XP first.
    fn leaderboard(&self, limit: i64) -> impl Future<Output = Result<Vec<User>, sqlx::Error>> + Send;
}

type UserRow = (
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    i64,
    i64,
    String,
    String,
    String,
);

const USER_COLUMNS: &str =
    "id, google_id, name, email, picture, xp, streak, rewards, created_at, updated_at";

fn user_from_row(row: UserRow) -> Result<User, sqlx::Error> {
    let (id, google_id, name, email, picture, xp, streak, rewards, created_at, updated_at) = row;
    Ok(User {
        id,
        google_id,
        name,
        email,
        picture,
        xp,
        streak,
        rewards: from_json(&rewards)?,
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    })
}

pub(crate) async fn fetch_user<'c>(
    executor: impl SqliteExecutor<'c>,
    id: i64,
) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
    row.map(user_from_row).transpose()
}

pub(crate) async fn set_user_xp<'c>(
    executor: impl SqliteExecutor<'c>,
    id: i64,
    xp: i64,
    rewards: &[String],
) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "UPDATE users SET xp = ?1, rewards = ?2, updated_at = ?3 WHERE id = ?4 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(xp)
    .bind(to_json(rewards)?)
    .bind(now())
    .bind(id)
    .fetch_optional(executor)
    .await?;
    row.map(user_from_row).transpose()
}

impl UserStore for SqliteStore {
    async fn upsert_user(
        &self,
        google_id: &str,
        name: &str,
        email: Option<&str>,
        picture: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let ts = now();
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (google_id, name, email, picture, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
             ON CONFLICT (google_id) DO UPDATE SET \
               name = excluded.name, email = excluded.email, \
               picture = excluded.picture, updated_at = excluded.updated_at \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(google_id)
        .bind(name)
        .bind(email)
        .bind(picture)
        .bind(&ts)
        .fetch_one(self.pool())
        .await?;
        user_from_row(row)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        fetch_user(self.pool(), id).await
    }

    async fn get_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE google_id = ?1"))
                .bind(google_id)
                .fetch_optional(self.pool())
                .await?;
        row.map(user_from_row).transpose()
    }

    async fn update_user_xp(
        &self,
        id: i64,
        xp: i64,
        rewards: &[String],
    ) -> Result<Option<User>, sqlx::Error> {
        set_user_xp(self.pool(), id, xp, rewards).await
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY xp DESC, id ASC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(user_from_row).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::fixture;

    #[tokio::test]
    async fn upsert_refreshes_profile() {
        let store = fixture::store().await;
        let first = store.upsert_user("g-1", "Ada", Some("ada@example.com"), None).await.unwrap();
        let second = store.upsert_user("g-1", "Ada L.", None, Some("pic")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Ada L.");
        assert_eq!(second.email, None);
        assert_eq!(second.picture.as_deref(), Some("pic"));
        assert!(second.rewards.is_empty());
    }

    #[tokio::test]
    async fn xp_update_and_leaderboard() {
        let store = fixture::store().await;
        let ada = fixture::user(&store, "g-1", "Ada").await;
        let bob = fixture::user(&store, "g-2", "Bob").await;
        store.update_user_xp(bob.id, 300, &["xp-500".to_owned()]).await.unwrap();
        let updated = store.update_user_xp(ada.id, 900, &[]).await.unwrap().unwrap();
        assert_eq!(updated.xp, 900);

        let board = store.leaderboard(10).await.unwrap();
        let names: Vec<_> = board.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Bob"]);
        assert_eq!(board[1].rewards, vec!["xp-500"]);

        assert!(store.update_user_xp(999, 1, &[]).await.unwrap().is_none());
    }
}
