use crate::entities::User;
use crate::services::ledger::{self, Reward};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /api/users/upsert`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpsertUserRequest {
    #[validate(length(min = 1, message = "google_id is required"))]
    pub google_id: String,
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
}

/// Body of `PUT /api/users/{id}/xp`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateXpRequest {
    #[validate(range(min = 0, message = "xp must not be negative"))]
    pub xp: i64,
    /// Replaces the reward list when present.
    pub rewards: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub google_id: String,
    pub name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub xp: i64,
    pub streak: i64,
    pub rewards: Vec<String>,
    /// Player level derived from `xp`.
    pub level: i64,
    pub rank: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RewardResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Zero for rewards unlocked by an event rather than an XP total.
    pub xp_threshold: i64,
}

impl User {
    pub fn to_response(&self) -> UserResponse {
        let level = ledger::level_for(self.xp);
        UserResponse {
            id: self.id,
            google_id: self.google_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            picture: self.picture.clone(),
            xp: self.xp,
            streak: self.streak,
            rewards: self.rewards.clone(),
            level,
            rank: ledger::rank_for(level).to_string(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

impl Reward {
    pub fn to_response(self) -> RewardResponse {
        RewardResponse {
            id: self.to_string(),
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            xp_threshold: self.xp_threshold(),
        }
    }
}
