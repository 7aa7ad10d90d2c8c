//! Prompt catalogue for the tutoring features.
//!
//! Every operation is a fixed system prompt plus a templated user prompt.
//! Operations whose output must be parsed (roadmap, quiz, subtopics, code
//! analysis) use the non-streaming path; prose uses streaming.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::{ChatMessage, Completion, LanguageModel};
use crate::error::LlmError;
use crate::extract::{JsonShape, extract_json};

/// One level of a generated roadmap outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelOutline {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub xp_reward: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtopicOutline {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_index: i32,
    #[serde(default)]
    pub explanation: String,
}

/// Scores returned by [`Tutor::analyze_code`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeAnalysis {
    #[serde(default)]
    pub readability: u32,
    #[serde(default)]
    pub efficiency: u32,
    #[serde(default)]
    pub explanation: String,
}

impl CodeAnalysis {
    fn unparsed() -> Self {
        Self {
            readability: 0,
            efficiency: 0,
            explanation: "Could not parse AI response.".into(),
        }
    }
}

const THEORY_SYSTEM: &str =
    "Write educational content with markdown (##, bullets, bold, code). 300-500 words with examples.";
const SUBTOPIC_SYSTEM: &str =
    "Write detailed educational content with markdown. 400-600 words with examples.";

/// Tutoring operations on top of a [`LanguageModel`].
#[derive(Clone)]
pub struct Tutor {
    model: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for Tutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Tutor")
    }
}

impl Tutor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    // ── Roadmaps and levels ─────────────────────────────────────────────────

    /// Six levels from beginner to advanced.
    pub async fn roadmap(&self, topic: &str) -> Result<Vec<LevelOutline>, LlmError> {
        let request = Completion::new(vec![
            ChatMessage::system(
                "You are an expert curriculum designer. Return ONLY a valid JSON array, no markdown.",
            ),
            ChatMessage::user(format!(
                "Create a 6-level roadmap for \"{topic}\" (beginner→advanced). \
                 JSON: [{{\"title\":\"...\",\"description\":\"...\",\"xpReward\":100}}]. \
                 XP: 100, +50/level. ONLY JSON."
            )),
        ])
        .temperature(0.7)
        .max_tokens(2048);
        let text = self.model.complete(&request).await?;
        extract_json(&text, JsonShape::Array, "roadmap")
    }

    fn theory_request(topic: &str, title: &str, description: &str) -> Completion {
        Completion::new(vec![
            ChatMessage::system(THEORY_SYSTEM),
            ChatMessage::user(format!(
                "Theory for \"{title}\" (topic: \"{topic}\"). Context: {description}. \
                 Include: explanation, key points, example, fun fact."
            )),
        ])
        .temperature(0.6)
        .max_tokens(2048)
    }

    pub async fn level_content(
        &self,
        topic: &str,
        title: &str,
        description: &str,
    ) -> Result<String, LlmError> {
        self.model
            .complete(&Self::theory_request(topic, title, description))
            .await
    }

    pub async fn level_content_stream(
        &self,
        topic: &str,
        title: &str,
        description: &str,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, LlmError> {
        self.model
            .complete_stream(&Self::theory_request(topic, title, description), on_token)
            .await
    }

    /// Four to six subtopics for one level.
    pub async fn subtopics(
        &self,
        topic: &str,
        title: &str,
        description: &str,
    ) -> Result<Vec<SubtopicOutline>, LlmError> {
        let request = Completion::new(vec![
            ChatMessage::system("Break down a topic into subtopics. Return ONLY a valid JSON array."),
            ChatMessage::user(format!(
                "Break \"{title}\" (course: \"{topic}\") into 4-6 subtopics. Context: {description}. \
                 JSON: [{{\"title\":\"...\",\"description\":\"...\"}}]. ONLY JSON."
            )),
        ])
        .temperature(0.6)
        .max_tokens(1024);
        let text = self.model.complete(&request).await?;
        extract_json(&text, JsonShape::Array, "subtopics")
    }

    fn subtopic_request(topic: &str, level: &str, subtopic: &str, description: &str) -> Completion {
        Completion::new(vec![
            ChatMessage::system(SUBTOPIC_SYSTEM),
            ChatMessage::user(format!(
                "Content for \"{subtopic}\" (level: \"{level}\", course: \"{topic}\"). Context: {description}."
            )),
        ])
        .temperature(0.6)
        .max_tokens(2048)
    }

    pub async fn subtopic_content(
        &self,
        topic: &str,
        level: &str,
        subtopic: &str,
        description: &str,
    ) -> Result<String, LlmError> {
        self.model
            .complete(&Self::subtopic_request(topic, level, subtopic, description))
            .await
    }

    pub async fn subtopic_content_stream(
        &self,
        topic: &str,
        level: &str,
        subtopic: &str,
        description: &str,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, LlmError> {
        self.model
            .complete_stream(&Self::subtopic_request(topic, level, subtopic, description), on_token)
            .await
    }

    /// Five multiple-choice questions.
    pub async fn quiz(&self, topic: &str, title: &str) -> Result<Vec<GeneratedQuestion>, LlmError> {
        let request = Completion::new(vec![
            ChatMessage::system("Generate quiz questions. Return ONLY a valid JSON array."),
            ChatMessage::user(format!(
                "5 quiz questions about \"{title}\" (topic: \"{topic}\"). \
                 JSON: [{{\"question\":\"...\",\"options\":[\"a\",\"b\",\"c\",\"d\"],\"correctIndex\":0,\"explanation\":\"...\"}}]. \
                 ONLY JSON."
            )),
        ])
        .temperature(0.5)
        .max_tokens(2048);
        let text = self.model.complete(&request).await?;
        extract_json(&text, JsonShape::Array, "quiz")
    }

    // ── Code playground ─────────────────────────────────────────────────────

    pub async fn explain_code(&self, code: &str, language: &str) -> Result<String, LlmError> {
        let request = Completion::new(vec![
            ChatMessage::system("You are an expert programming tutor. Explain code clearly and concisely."),
            ChatMessage::user(format!("Explain this {language} code:\n\n```{language}\n{code}\n```")),
        ])
        .temperature(0.5);
        self.model.complete(&request).await
    }

    pub async fn hint(&self, code: &str, error: &str) -> Result<String, LlmError> {
        let request = Completion::new(vec![
            ChatMessage::system("Provide hints without giving full answers. Be encouraging."),
            ChatMessage::user(format!("Error: \"{error}\"\nCode:\n{code}\n\nProvide a hint only.")),
        ])
        .temperature(0.6);
        self.model.complete(&request).await
    }

    pub async fn recommend(&self, xp: i64, completed_topics: &[String]) -> Result<String, LlmError> {
        let request = Completion::new(vec![
            ChatMessage::system("You are an AI learning advisor."),
            ChatMessage::user(format!(
                "Student has {xp} XP, finished: [{}]. Suggest 3 next topics.",
                completed_topics.join(", ")
            )),
        ])
        .temperature(0.7);
        self.model.complete(&request).await
    }

    /// Unparseable output degrades to zero scores rather than an error.
    pub async fn analyze_code(&self, code: &str) -> Result<CodeAnalysis, LlmError> {
        let request = Completion::new(vec![
            ChatMessage::system(
                "Return a JSON object: { readability: 0-100, efficiency: 0-100, explanation: \"...\" }. ONLY valid JSON.",
            ),
            ChatMessage::user(format!("Analyze:\n\n{code}")),
        ])
        .temperature(0.3);
        let text = self.model.complete(&request).await?;
        Ok(extract_json(&text, JsonShape::Object, "code analysis").unwrap_or_else(|_| CodeAnalysis::unparsed()))
    }

    pub async fn generate_code_stream(
        &self,
        prompt: &str,
        language: &str,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, LlmError> {
        let request = Completion::new(vec![
            ChatMessage::system(format!(
                "You are an expert {language} programmer. Generate clean, well-commented, production-quality code. \
                 Return ONLY the code, no explanations, no markdown fences, no extra text. \
                 The code should be complete and runnable."
            )),
            ChatMessage::user(format!("Write {language} code for: {prompt}")),
        ])
        .temperature(0.4)
        .max_tokens(4096);
        self.model.complete_stream(&request, on_token).await
    }

    pub async fn code_insights_stream(
        &self,
        code: &str,
        language: &str,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, LlmError> {
        let request = Completion::new(vec![
            ChatMessage::system(insights_prompt(language)),
            ChatMessage::user(format!(
                "Analyze this {language} code in complete detail:\n\n```{language}\n{code}\n```"
            )),
        ])
        .temperature(0.4)
        .max_tokens(4096);
        self.model.complete_stream(&request, on_token).await
    }

    // ── Chat ────────────────────────────────────────────────────────────────

    fn chat_request(history: &[ChatMessage], system: Option<&str>) -> Completion {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        messages.extend_from_slice(history);
        Completion::new(messages).temperature(0.7)
    }

    pub async fn chat(&self, history: &[ChatMessage], system: Option<&str>) -> Result<String, LlmError> {
        self.model.complete(&Self::chat_request(history, system)).await
    }

    pub async fn chat_stream(
        &self,
        history: &[ChatMessage],
        system: Option<&str>,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, LlmError> {
        self.model
            .complete_stream(&Self::chat_request(history, system), on_token)
            .await
    }
}

fn insights_prompt(language: &str) -> String {
    format!(
        "You are a senior software engineer and expert code reviewer. Provide a thorough, detailed analysis \
of the given code. Structure your response with these sections using markdown headers:

## Overview
Brief summary of what the code does.

## Line-by-Line Explanation
Walk through the key parts of the code explaining the logic.

## Complexity Analysis
- **Time Complexity**: Big-O analysis
- **Space Complexity**: Big-O analysis

## Strengths
What the code does well (list 2-4 points).

## Issues & Improvements
Bugs, edge cases, or improvements (list 2-4 points with suggested fixes).

## Best Practices
Relevant best practices for this {language} code.

## Readability Score: X/10
## Efficiency Score: X/10

Be specific, reference actual lines/variables, and provide actionable suggestions."
    )
}
