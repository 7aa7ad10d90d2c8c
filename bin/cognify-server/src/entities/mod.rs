//! Persistence layer.
//!
//! Each concern has its own store trait ([`UserStore`], [`RoadmapStore`], …)
//! implemented for [`SqliteStore`].  Trait methods use `impl Future` in their
//! signatures so no `async-trait` boxing is needed.
//!
//! Timestamps are stored as RFC 3339 text and list-valued columns
//! (`rewards`, `levels`, `completed_levels`, `quiz_results`) as JSON text.

pub mod chat;
pub mod code;
pub mod dao;
pub mod progress;
pub mod roadmap;
pub mod room;
pub mod user;

pub use dao::{
    ChatMessage, ChatSession, CodeHistoryEntry, Level, Progress, QuizQuestion, QuizResult, Roadmap,
    Room, RoomMember, RoomMessage, RoomSummary, SessionSummary, Subtopic, User,
};

pub use chat::ChatStore;
pub use code::CodeHistoryStore;
pub use progress::ProgressStore;
pub use roadmap::{LevelPatch, RoadmapStore};
pub use room::{NewRoomMessage, RoomStore};
pub use user::UserStore;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{Sqlite, SqlitePool, Transaction};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` is a sqlx SQLite URL, e.g. `"sqlite://cognify.db?mode=rwc"`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        if url.starts_with("sqlite::memory:") {
            return Self::memory().await;
        }
        let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::migrate(pool).await
    }

    /// A private in-memory database; one connection so every query sees it.
    pub async fn memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Begin a transaction that already holds the database write lock.
    ///
    /// Read-modify-write sequences started this way queue behind each other on
    /// the busy timeout; a plain deferred `BEGIN` would fail with `SQLITE_BUSY`
    /// when two readers both try to upgrade.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        // Any UPDATE takes the RESERVED lock, even one that matches no rows.
        sqlx::query("UPDATE users SET id = id WHERE 0").execute(&mut *tx).await?;
        Ok(tx)
    }
}

// ── column helpers ───────────────────────────────────────────────────────────

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Fixture data shared by store, service and route tests.
#[cfg(test)]
pub(crate) mod fixture {
    use super::*;

    pub async fn store() -> SqliteStore {
        SqliteStore::memory().await.unwrap()
    }

    pub async fn user(store: &SqliteStore, google_id: &str, name: &str) -> User {
        store.upsert_user(google_id, name, None, None).await.unwrap()
    }

    pub fn levels(n: usize) -> Vec<Level> {
        (0..n)
            .map(|i| Level {
                id: format!("level-{}", i + 1),
                order: i as u32 + 1,
                title: format!("Level {}", i + 1),
                description: format!("Description {}", i + 1),
                xp_reward: 100 + 50 * i as u32,
                ..Level::default()
            })
            .collect()
    }

    pub async fn roadmap(store: &SqliteStore, user_id: i64, topic: &str) -> Roadmap {
        store
            .create_roadmap(Some(user_id), None, topic, &levels(3))
            .await
            .unwrap()
            .0
    }
}
