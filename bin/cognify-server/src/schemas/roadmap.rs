use crate::entities::{Level, QuizQuestion, Roadmap, Subtopic};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /api/roadmaps`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateRoadmapRequest {
    pub user_id: Option<i64>,
    /// Anonymous owner key for callers without an account.
    pub client_id: Option<String>,
    #[validate(length(min = 1, message = "topic is required"))]
    pub topic: String,
    pub levels: Vec<Level>,
}

/// Body of `PUT /api/roadmaps/{id}/levels`; absent parts are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLevelRequest {
    #[validate(length(min = 1, message = "levelId is required"))]
    pub level_id: String,
    pub theory_content: Option<String>,
    pub subtopics: Option<Vec<Subtopic>>,
    pub quiz: Option<Vec<QuizQuestion>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoadmapResponse {
    pub id: i64,
    pub user_id: Option<i64>,
    pub client_id: Option<String>,
    pub topic: String,
    pub levels: Vec<Level>,
    pub created_at: String,
    /// Set on create: `true` when the (user, topic) roadmap already existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<bool>,
}

impl Roadmap {
    pub fn to_response(&self) -> RoadmapResponse {
        RoadmapResponse {
            id: self.id,
            user_id: self.user_id,
            client_id: self.client_id.clone(),
            topic: self.topic.clone(),
            levels: self.levels.clone(),
            created_at: self.created_at.to_rfc3339(),
            existing: None,
        }
    }

    pub fn to_created_response(&self, existing: bool) -> RoadmapResponse {
        RoadmapResponse { existing: Some(existing), ..self.to_response() }
    }
}
