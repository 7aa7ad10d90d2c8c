use chrono::{DateTime, Utc};

/// A row in the `code_history` table.
#[derive(Debug, Clone)]
pub struct CodeHistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub language: String,
    pub code: String,
    pub stdin: String,
    pub output: String,
    pub created_at: DateTime<Utc>,
}
