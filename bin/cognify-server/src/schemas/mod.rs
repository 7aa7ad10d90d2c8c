//! Request / response types for the `/api` routes.
//!
//! Database rows are exposed with snake_case field names and RFC 3339
//! timestamps; level content keeps the camelCase shape the front-end stores.

pub mod ai;
pub mod chat;
pub mod code;
pub mod progress;
pub mod roadmap;
pub mod room;
pub mod user;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// `?limit=` query shared by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    /// The requested limit clamped to `1..=max`, or `default`.
    pub fn or(&self, default: i64, max: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, max)
    }
}

/// Plain generated text.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentResponse {
    pub content: String,
}

/// `{"deleted": bool}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub deleted: bool,
}
