use crate::entities::CodeHistoryEntry;
use cognify_llm::{ExecutionResult, LanguageConfig};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /api/code-history`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SaveCodeRequest {
    pub user_id: i64,
    #[validate(length(min = 1, message = "language is required"))]
    pub language: String,
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
    #[serde(default)]
    pub stdin: String,
    #[serde(default)]
    pub output: String,
}

/// Body of `POST /api/code/execute`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ExecuteRequest {
    /// Catalogue id, e.g. `python` or `rust`.
    #[validate(length(min = 1, message = "language is required"))]
    pub language: String,
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
    #[serde(default)]
    pub stdin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CodeHistoryResponse {
    pub id: i64,
    pub user_id: i64,
    pub language: String,
    pub code: String,
    pub stdin: String,
    pub output: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub signal: Option<String>,
    pub language: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LanguageResponse {
    pub id: String,
    pub label: String,
    pub extension: String,
    pub supports_stdin: bool,
    /// Rendered in the browser instead of executed.
    pub is_web: bool,
}

impl CodeHistoryEntry {
    pub fn to_response(&self) -> CodeHistoryResponse {
        CodeHistoryResponse {
            id: self.id,
            user_id: self.user_id,
            language: self.language.clone(),
            code: self.code.clone(),
            stdin: self.stdin.clone(),
            output: self.output.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl From<ExecutionResult> for ExecutionResponse {
    fn from(r: ExecutionResult) -> Self {
        Self {
            stdout: r.stdout,
            stderr: r.stderr,
            exit_code: r.exit_code,
            signal: r.signal,
            language: r.language,
            version: r.version,
        }
    }
}

impl From<&LanguageConfig> for LanguageResponse {
    fn from(l: &LanguageConfig) -> Self {
        Self {
            id: l.id.to_owned(),
            label: l.label.to_owned(),
            extension: l.extension.to_owned(),
            supports_stdin: l.supports_stdin,
            is_web: l.is_web,
        }
    }
}
