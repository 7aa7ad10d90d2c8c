use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A row in the `user_progress` table; unique per (user, roadmap).
#[derive(Debug, Clone)]
pub struct Progress {
    pub id: i64,
    pub user_id: i64,
    pub roadmap_id: i64,
    pub completed_levels: Vec<String>,
    pub quiz_results: Vec<QuizResult>,
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    /// Not yet persisted; `id` is assigned on first save.
    pub fn empty(user_id: i64, roadmap_id: i64) -> Self {
        Self {
            id: 0,
            user_id,
            roadmap_id,
            completed_levels: Vec::new(),
            quiz_results: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Latest graded submission for one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub level_id: String,
    pub score: u32,
    pub total: u32,
    /// Chosen option per question; `-1` when unanswered.
    pub answers: Vec<i32>,
    #[serde(default)]
    pub submitted_at: String,
}
