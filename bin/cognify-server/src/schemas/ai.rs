//! Bodies of the `/api/ai` routes.
//!
//! Streaming routes answer with server-sent events: `{"delta": "..."}` for
//! every new piece of text, then `{"done": true, "content": "..."}` with the
//! full text, or `{"error": "..."}`.

use super::chat::MessageRole;
use cognify_llm::{ChatMessage, CodeAnalysis, GeneratedQuestion, SubtopicOutline};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /api/ai/roadmap`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct GenerateRoadmapRequest {
    #[validate(length(min = 1, max = 200, message = "topic must be 1-200 characters"))]
    pub topic: String,
    pub user_id: Option<i64>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

/// Body of `POST /api/ai/chat` and `POST /api/ai/chat/stream`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "messages must not be empty"))]
    pub messages: Vec<ChatTurn>,
    /// Persona or custom system prompt.
    pub system: Option<String>,
    /// When both are set the assistant reply is stored in this session.
    pub session_id: Option<i64>,
    pub user_id: Option<i64>,
}

/// Body of `POST /api/ai/level/stream`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct LevelContentRequest {
    #[validate(length(min = 1, message = "topic is required"))]
    pub topic: String,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// When both are set the finished theory is written to that level.
    pub roadmap_id: Option<i64>,
    pub level_id: Option<String>,
}

/// Body of `POST /api/ai/subtopic/stream`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SubtopicContentRequest {
    #[validate(length(min = 1, message = "topic is required"))]
    pub topic: String,
    #[validate(length(min = 1, message = "level_title is required"))]
    pub level_title: String,
    #[validate(length(min = 1, message = "subtopic_title is required"))]
    pub subtopic_title: String,
    #[serde(default)]
    pub description: String,
    /// When all three are set the finished text is written to that subtopic.
    pub roadmap_id: Option<i64>,
    pub level_id: Option<String>,
    pub subtopic_id: Option<String>,
}

/// Body of `POST /api/ai/subtopics`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SubtopicsRequest {
    #[validate(length(min = 1, message = "topic is required"))]
    pub topic: String,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Body of `POST /api/ai/quiz`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct QuizRequest {
    #[validate(length(min = 1, message = "topic is required"))]
    pub topic: String,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
}

/// Body of `POST /api/ai/code/explain`, `/code/insights/stream` and `/code/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CodeRequest {
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
    #[serde(default)]
    pub language: String,
}

/// Body of `POST /api/ai/code/hint`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct HintRequest {
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
    #[serde(default)]
    pub error: String,
}

/// Body of `POST /api/ai/code/generate/stream`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct GenerateCodeRequest {
    #[validate(length(min = 1, message = "prompt is required"))]
    pub prompt: String,
    #[validate(length(min = 1, message = "language is required"))]
    pub language: String,
}

/// Body of `POST /api/ai/recommendation`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub completed_topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubtopicOutlineResponse {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i32,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CodeAnalysisResponse {
    /// 0-100.
    pub readability: u32,
    /// 0-100.
    pub efficiency: u32,
    pub explanation: String,
}

impl From<&ChatTurn> for ChatMessage {
    fn from(turn: &ChatTurn) -> Self {
        match turn.role {
            MessageRole::System => ChatMessage::system(turn.content.clone()),
            MessageRole::User => ChatMessage::user(turn.content.clone()),
            MessageRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        }
    }
}

impl ChatRequest {
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(ChatMessage::from).collect()
    }
}

impl From<SubtopicOutline> for SubtopicOutlineResponse {
    fn from(s: SubtopicOutline) -> Self {
        Self { title: s.title, description: s.description }
    }
}

impl From<GeneratedQuestion> for QuestionResponse {
    fn from(q: GeneratedQuestion) -> Self {
        Self {
            question: q.question,
            options: q.options,
            correct_index: q.correct_index,
            explanation: q.explanation,
        }
    }
}

impl From<CodeAnalysis> for CodeAnalysisResponse {
    fn from(a: CodeAnalysis) -> Self {
        Self { readability: a.readability, efficiency: a.efficiency, explanation: a.explanation }
    }
}
