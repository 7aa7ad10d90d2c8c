use chrono::{DateTime, Utc};

/// A row in the `users` table.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    /// OAuth subject; unique.
    pub google_id: String,
    pub name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub xp: i64,
    pub streak: i64,
    /// Earned reward ids, e.g. `"first-quiz"`.
    pub rewards: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
