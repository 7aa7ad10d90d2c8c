use crate::entities::{Progress, QuizResult};
use crate::services::ledger::{self, LedgerOutcome, QuizOutcome};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of `PUT /api/progress`; overwrites the stored lists that are present.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveProgressRequest {
    pub user_id: i64,
    pub roadmap_id: i64,
    pub completed_levels: Option<Vec<String>>,
    pub quiz_results: Option<Vec<QuizResult>>,
}

/// Body of `POST /api/progress/levels/complete`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CompleteLevelRequest {
    pub user_id: i64,
    pub roadmap_id: i64,
    #[validate(length(min = 1, message = "level_id is required"))]
    pub level_id: String,
}

/// Body of `POST /api/progress/quiz`; `-1` marks an unanswered question.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SubmitQuizRequest {
    pub user_id: i64,
    pub roadmap_id: i64,
    #[validate(length(min = 1, message = "level_id is required"))]
    pub level_id: String,
    pub answers: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProgressResponse {
    pub id: i64,
    pub user_id: i64,
    pub roadmap_id: i64,
    pub completed_levels: Vec<String>,
    pub quiz_results: Vec<QuizResult>,
    pub updated_at: String,
}

/// Progress plus the user's totals after a ledger mutation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerResponse {
    pub progress: ProgressResponse,
    pub xp: i64,
    pub level: i64,
    pub rank: String,
    pub rewards: Vec<String>,
    pub new_rewards: Vec<String>,
    pub xp_gained: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizSubmissionResponse {
    pub result: QuizResult,
    pub perfect: bool,
    pub ledger: LedgerResponse,
}

impl Progress {
    pub fn to_response(&self) -> ProgressResponse {
        ProgressResponse {
            id: self.id,
            user_id: self.user_id,
            roadmap_id: self.roadmap_id,
            completed_levels: self.completed_levels.clone(),
            quiz_results: self.quiz_results.clone(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

impl LedgerOutcome {
    pub fn to_response(&self) -> LedgerResponse {
        let level = ledger::level_for(self.user.xp);
        LedgerResponse {
            progress: self.progress.to_response(),
            xp: self.user.xp,
            level,
            rank: ledger::rank_for(level).to_string(),
            rewards: self.user.rewards.clone(),
            new_rewards: self.new_rewards.clone(),
            xp_gained: self.xp_gained,
        }
    }
}

impl QuizOutcome {
    pub fn to_response(&self) -> QuizSubmissionResponse {
        QuizSubmissionResponse {
            result: self.result.clone(),
            perfect: self.perfect,
            ledger: self.ledger.to_response(),
        }
    }
}
