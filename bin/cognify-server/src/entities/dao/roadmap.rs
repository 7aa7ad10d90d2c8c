use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A row in the `roadmaps` table.
#[derive(Debug, Clone)]
pub struct Roadmap {
    pub id: i64,
    pub user_id: Option<i64>,
    /// Browser-side id for roadmaps created before sign-in.
    pub client_id: Option<String>,
    pub topic: String,
    /// Stored as one JSON array column.
    pub levels: Vec<Level>,
    pub created_at: DateTime<Utc>,
}

impl Roadmap {
    pub fn level(&self, level_id: &str) -> Option<&Level> {
        self.levels.iter().find(|l| l.id == level_id)
    }
}

/// One unit of learning content; theory, subtopics and quiz are filled lazily.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Level {
    pub id: String,
    pub order: u32,
    pub title: String,
    pub description: String,
    pub theory_content: String,
    pub subtopics: Vec<Subtopic>,
    pub quiz: Vec<QuizQuestion>,
    pub xp_reward: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Subtopic {
    /// `{level}-sub{i}`
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizQuestion {
    /// `{level}-q{i}`
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i32,
    pub explanation: String,
}
