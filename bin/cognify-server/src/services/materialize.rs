//! Lazy level materialisation.
//!
//! Levels are generated as bare outlines.  The first time a level is opened
//! its theory, subtopics and quiz are generated concurrently and written back
//! in one read-modify-write; a part that fails to generate stays empty and is
//! retried on the next view.

use cognify_llm::{GeneratedQuestion, LevelOutline, SubtopicOutline, Tutor};
use tracing::{info, warn};

use crate::entities::{Level, LevelPatch, QuizQuestion, Roadmap, RoadmapStore, SqliteStore, Subtopic};
use crate::error::ServerError;

/// Level outlines as stored levels; ids are `level-1`, `level-2`, ….
pub fn levels_for(outlines: Vec<LevelOutline>) -> Vec<Level> {
    outlines
        .into_iter()
        .enumerate()
        .map(|(i, o)| Level {
            id: format!("level-{}", i + 1),
            order: i as u32 + 1,
            title: o.title,
            description: o.description,
            xp_reward: if o.xp_reward > 0 { o.xp_reward } else { 100 + 50 * i as u32 },
            ..Level::default()
        })
        .collect()
}

pub fn subtopics_for(level_id: &str, outlines: Vec<SubtopicOutline>) -> Vec<Subtopic> {
    outlines
        .into_iter()
        .enumerate()
        .map(|(i, s)| Subtopic {
            id: format!("{level_id}-sub{i}"),
            title: s.title,
            description: s.description,
            content: String::new(),
        })
        .collect()
}

pub fn quiz_for(level_id: &str, questions: Vec<GeneratedQuestion>) -> Vec<QuizQuestion> {
    questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| QuizQuestion {
            id: format!("{level_id}-q{i}"),
            question: q.question,
            options: q.options,
            correct_index: q.correct_index,
            explanation: q.explanation,
        })
        .collect()
}

/// Return `level_id` of `roadmap`, generating whatever it is still missing.
pub async fn materialize_level(
    store: &SqliteStore,
    tutor: &Tutor,
    roadmap: &Roadmap,
    level_id: &str,
) -> Result<Level, ServerError> {
    let level = roadmap
        .level(level_id)
        .ok_or_else(|| ServerError::NotFound("Level not found".into()))?;
    let topic = roadmap.topic.as_str();

    let theory = async {
        if !level.theory_content.is_empty() {
            return None;
        }
        tutor
            .level_content(topic, &level.title, &level.description)
            .await
            .inspect_err(|e| warn!(level_id, error = %e, "theory generation failed"))
            .ok()
            .filter(|t| !t.trim().is_empty())
    };
    let subtopics = async {
        if !level.subtopics.is_empty() {
            return None;
        }
        tutor
            .subtopics(topic, &level.title, &level.description)
            .await
            .inspect_err(|e| warn!(level_id, error = %e, "subtopic generation failed"))
            .ok()
            .map(|s| subtopics_for(&level.id, s))
            .filter(|s| !s.is_empty())
    };
    let quiz = async {
        if !level.quiz.is_empty() {
            return None;
        }
        tutor
            .quiz(topic, &level.title)
            .await
            .inspect_err(|e| warn!(level_id, error = %e, "quiz generation failed"))
            .ok()
            .map(|q| quiz_for(&level.id, q))
            .filter(|q| !q.is_empty())
    };
    let (theory_content, subtopics, quiz) = tokio::join!(theory, subtopics, quiz);

    let patch = LevelPatch { theory_content, subtopics, quiz, ..LevelPatch::default() };
    if patch.is_empty() {
        return Ok(level.clone());
    }
    info!(
        roadmap_id = roadmap.id,
        level_id,
        theory = patch.theory_content.is_some(),
        subtopics = patch.subtopics.as_ref().map_or(0, Vec::len),
        quiz = patch.quiz.as_ref().map_or(0, Vec::len),
        "level materialised"
    );
    store
        .update_level(roadmap.id, level_id, patch)
        .await?
        .ok_or_else(|| ServerError::NotFound("Level not found".into()))
}

/// Write streamed theory back to its level.
pub async fn save_theory(
    store: &SqliteStore,
    roadmap_id: i64,
    level_id: &str,
    content: &str,
) -> Result<Level, ServerError> {
    let patch = LevelPatch { theory_content: Some(content.to_owned()), ..LevelPatch::default() };
    store
        .update_level(roadmap_id, level_id, patch)
        .await?
        .ok_or_else(|| ServerError::NotFound("Level not found".into()))
}

/// Write streamed subtopic text back to its subtopic.
pub async fn save_subtopic_content(
    store: &SqliteStore,
    roadmap_id: i64,
    level_id: &str,
    subtopic_id: &str,
    content: &str,
) -> Result<Level, ServerError> {
    let patch = LevelPatch {
        subtopic_content: Some((subtopic_id.to_owned(), content.to_owned())),
        ..LevelPatch::default()
    };
    store
        .update_level(roadmap_id, level_id, patch)
        .await?
        .ok_or_else(|| ServerError::NotFound("Level or subtopic not found".into()))
}
