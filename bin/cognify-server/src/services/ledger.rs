//! XP, levels, ranks and milestone rewards.
//!
//! The pure helpers mutate a [`Progress`] / reward list in place; the async
//! entry points load the user, roadmap and progress, apply one mutation,
//! re-evaluate every reward threshold and persist the result.  Each entry
//! point runs inside one write transaction, so concurrent completions for the
//! same user never lose each other's XP.

use sqlx::SqliteConnection;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::info;

use crate::entities::progress::{count_started, fetch_progress, upsert_progress};
use crate::entities::roadmap::fetch_roadmap;
use crate::entities::user::{fetch_user, set_user_xp};
use crate::entities::{Progress, QuizResult, Roadmap, SqliteStore, User};
use crate::error::ServerError;
use crate::services::quiz;

/// XP needed per player level.
pub const XP_PER_LEVEL: i64 = 200;

/// Started roadmaps needed for [`Reward::ThreeRoadmaps`].
const EXPLORER_ROADMAPS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString, EnumIter)]
pub enum Reward {
    #[strum(serialize = "first-quiz")]
    FirstQuiz,
    #[strum(serialize = "xp-500")]
    Xp500,
    #[strum(serialize = "xp-1000")]
    Xp1000,
    #[strum(serialize = "xp-2500")]
    Xp2500,
    #[strum(serialize = "xp-5000")]
    Xp5000,
    #[strum(serialize = "xp-10000")]
    Xp10000,
    #[strum(serialize = "perfect-quiz")]
    PerfectQuiz,
    #[strum(serialize = "three-roadmaps")]
    ThreeRoadmaps,
}

impl Reward {
    pub fn name(self) -> &'static str {
        match self {
            Reward::FirstQuiz => "Quiz Rookie",
            Reward::Xp500 => "Rising Star",
            Reward::Xp1000 => "Knowledge Seeker",
            Reward::Xp2500 => "AI Apprentice",
            Reward::Xp5000 => "Neural Knight",
            Reward::Xp10000 => "AI Oracle",
            Reward::PerfectQuiz => "Perfectionist",
            Reward::ThreeRoadmaps => "Explorer",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Reward::FirstQuiz => "Complete your first quiz",
            Reward::Xp500 => "Earn 500 XP",
            Reward::Xp1000 => "Earn 1,000 XP",
            Reward::Xp2500 => "Earn 2,500 XP",
            Reward::Xp5000 => "Earn 5,000 XP",
            Reward::Xp10000 => "Earn 10,000 XP",
            Reward::PerfectQuiz => "Score 100% on a quiz",
            Reward::ThreeRoadmaps => "Complete 3 different roadmaps",
        }
    }

    /// Zero for event-driven rewards.
    pub fn xp_threshold(self) -> i64 {
        match self {
            Reward::Xp500 => 500,
            Reward::Xp1000 => 1_000,
            Reward::Xp2500 => 2_500,
            Reward::Xp5000 => 5_000,
            Reward::Xp10000 => 10_000,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum Rank {
    Beginner,
    #[strum(serialize = "Knowledge Seeker")]
    KnowledgeSeeker,
    #[strum(serialize = "AI Apprentice")]
    AiApprentice,
    #[strum(serialize = "Neural Knight")]
    NeuralKnight,
    #[strum(serialize = "AI Oracle")]
    AiOracle,
}

pub fn level_for(xp: i64) -> i64 {
    xp.max(0) / XP_PER_LEVEL + 1
}

pub fn rank_for(level: i64) -> Rank {
    match level {
        50.. => Rank::AiOracle,
        25.. => Rank::NeuralKnight,
        12.. => Rank::AiApprentice,
        5.. => Rank::KnowledgeSeeker,
        _ => Rank::Beginner,
    }
}

/// Add `level_id` to the completed list once; returns the XP to credit.
pub fn mark_completed(progress: &mut Progress, level_id: &str, xp_reward: u32) -> u32 {
    if progress.completed_levels.iter().any(|l| l == level_id) {
        return 0;
    }
    progress.completed_levels.push(level_id.to_owned());
    xp_reward
}

/// Replace the result for the same level or append; `true` when appended.
pub fn record_result(progress: &mut Progress, result: QuizResult) -> bool {
    match progress.quiz_results.iter_mut().find(|r| r.level_id == result.level_id) {
        Some(existing) => {
            *existing = result;
            false
        }
        None => {
            progress.quiz_results.push(result);
            true
        }
    }
}

/// `true` when the reward was not held before.
pub fn award(rewards: &mut Vec<String>, reward: Reward) -> bool {
    if rewards.iter().any(|r| r == reward.as_ref()) {
        return false;
    }
    rewards.push(reward.to_string());
    true
}

/// Grant every threshold reward the totals now qualify for.
pub fn evaluate(rewards: &mut Vec<String>, xp: i64, started_roadmaps: i64) {
    for reward in Reward::iter() {
        let threshold = reward.xp_threshold();
        if threshold > 0 && xp >= threshold {
            award(rewards, reward);
        }
        if reward == Reward::ThreeRoadmaps && started_roadmaps >= EXPLORER_ROADMAPS {
            award(rewards, reward);
        }
    }
}

/// State after one ledger mutation.
#[derive(Debug, Clone)]
pub struct LedgerOutcome {
    pub user: User,
    pub progress: Progress,
    pub xp_gained: u32,
    pub new_rewards: Vec<String>,
}

/// Quiz submission outcome.
#[derive(Debug, Clone)]
pub struct QuizOutcome {
    pub result: QuizResult,
    pub perfect: bool,
    pub ledger: LedgerOutcome,
}

struct Context {
    user: User,
    roadmap: Roadmap,
    progress: Progress,
}

async fn load(
    conn: &mut SqliteConnection,
    user_id: i64,
    roadmap_id: i64,
) -> Result<Context, ServerError> {
    let user = fetch_user(&mut *conn, user_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("User not found".into()))?;
    let roadmap = fetch_roadmap(&mut *conn, roadmap_id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Roadmap not found".into()))?;
    let progress = fetch_progress(&mut *conn, user_id, roadmap_id)
        .await?
        .unwrap_or_else(|| Progress::empty(user_id, roadmap_id));
    Ok(Context { user, roadmap, progress })
}

/// Persist progress, credit XP and hand out whatever the new totals unlock.
async fn settle(
    conn: &mut SqliteConnection,
    user: User,
    progress: &Progress,
    xp_gained: u32,
    mut rewards: Vec<String>,
) -> Result<LedgerOutcome, ServerError> {
    let progress = upsert_progress(&mut *conn, progress).await?;
    let xp = user.xp + i64::from(xp_gained);
    let started = count_started(&mut *conn, user.id).await?;
    evaluate(&mut rewards, xp, started);

    let new_rewards: Vec<String> = rewards
        .iter()
        .filter(|r| !user.rewards.contains(r))
        .cloned()
        .collect();

    let user = if xp_gained > 0 || !new_rewards.is_empty() {
        set_user_xp(&mut *conn, user.id, xp, &rewards)
            .await?
            .ok_or_else(|| ServerError::NotFound("User not found".into()))?
    } else {
        user
    };
    Ok(LedgerOutcome { user, progress, xp_gained, new_rewards })
}

/// Complete a level; repeating it changes nothing.
pub async fn complete_level(
    store: &SqliteStore,
    user_id: i64,
    roadmap_id: i64,
    level_id: &str,
) -> Result<LedgerOutcome, ServerError> {
    let mut tx = store.begin_write().await?;
    let Context { user, roadmap, mut progress } = load(&mut tx, user_id, roadmap_id).await?;
    let level = roadmap
        .level(level_id)
        .ok_or_else(|| ServerError::NotFound("Level not found".into()))?;
    let gained = mark_completed(&mut progress, &level.id, level.xp_reward);
    let rewards = user.rewards.clone();
    let outcome = settle(&mut tx, user, &progress, gained, rewards).await?;
    tx.commit().await?;

    info!(user_id, roadmap_id, level_id, xp_gained = gained, "level completed");
    log_unlocked(&outcome);
    Ok(outcome)
}

/// Grade, record the result and complete the level.
pub async fn submit_quiz(
    store: &SqliteStore,
    user_id: i64,
    roadmap_id: i64,
    level_id: &str,
    answers: &[i32],
) -> Result<QuizOutcome, ServerError> {
    let mut tx = store.begin_write().await?;
    let Context { user, roadmap, mut progress } = load(&mut tx, user_id, roadmap_id).await?;
    let level = roadmap
        .level(level_id)
        .ok_or_else(|| ServerError::NotFound("Level not found".into()))?;
    if level.quiz.is_empty() {
        return Err(ServerError::BadRequest("Level has no quiz yet".into()));
    }

    let (result, perfect) = quiz::grade(&level.id, &level.quiz, answers);
    let mut rewards = user.rewards.clone();
    if record_result(&mut progress, result.clone()) {
        award(&mut rewards, Reward::FirstQuiz);
    }
    if perfect {
        award(&mut rewards, Reward::PerfectQuiz);
    }
    let gained = mark_completed(&mut progress, &level.id, level.xp_reward);
    let ledger = settle(&mut tx, user, &progress, gained, rewards).await?;
    tx.commit().await?;

    info!(user_id, roadmap_id, level_id, score = result.score, total = result.total, "quiz graded");
    log_unlocked(&ledger);
    Ok(QuizOutcome { result, perfect, ledger })
}

fn log_unlocked(outcome: &LedgerOutcome) {
    if !outcome.new_rewards.is_empty() {
        info!(user_id = outcome.user.id, rewards = ?outcome.new_rewards, "rewards unlocked");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{LevelPatch, ProgressStore, QuizQuestion, RoadmapStore, UserStore, fixture};

    #[test]
    fn levels_and_ranks() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(199), 1);
        assert_eq!(level_for(200), 2);
        assert_eq!(rank_for(level_for(800)), Rank::KnowledgeSeeker);
        assert_eq!(rank_for(12).to_string(), "AI Apprentice");
        assert_eq!(rank_for(50).to_string(), "AI Oracle");
        assert_eq!(rank_for(4), Rank::Beginner);
    }

    #[test]
    fn reward_ids_round_trip() {
        assert_eq!(Reward::Xp10000.to_string(), "xp-10000");
        assert_eq!("three-roadmaps".parse::<Reward>().unwrap(), Reward::ThreeRoadmaps);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let mut rewards = Vec::new();
        evaluate(&mut rewards, 1_000, 2);
        assert_eq!(rewards, vec!["xp-500", "xp-1000"]);
        evaluate(&mut rewards, 1_000, 3);
        assert_eq!(rewards.last().map(String::as_str), Some("three-roadmaps"));
        assert_eq!(rewards.len(), 3);
    }

    #[tokio::test]
    async fn completing_a_level_is_idempotent() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;

        let first = complete_level(&store, user.id, roadmap.id, "level-2").await.unwrap();
        assert_eq!(first.xp_gained, 150);
        assert_eq!(first.user.xp, 150);

        let again = complete_level(&store, user.id, roadmap.id, "level-2").await.unwrap();
        assert_eq!(again.xp_gained, 0);
        assert_eq!(again.user.xp, 150);
        assert_eq!(again.progress.completed_levels, vec!["level-2"]);
    }

    #[tokio::test]
    async fn unknown_level_is_not_found() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;
        let err = complete_level(&store, user.id, roadmap.id, "level-42").await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn perfect_quiz_awards_and_completes() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;
        let quiz = (0..3)
            .map(|i| QuizQuestion {
                id: format!("level-1-q{i}"),
                correct_index: i,
                options: vec!["a".into(), "b".into(), "c".into()],
                ..QuizQuestion::default()
            })
            .collect();
        let patch = LevelPatch { quiz: Some(quiz), ..LevelPatch::default() };
        store.update_level(roadmap.id, "level-1", patch).await.unwrap();

        let outcome = submit_quiz(&store, user.id, roadmap.id, "level-1", &[0, 1, 2]).await.unwrap();
        assert!(outcome.perfect);
        assert_eq!(outcome.result.score, outcome.result.total);
        assert_eq!(outcome.ledger.xp_gained, 100);
        assert_eq!(outcome.ledger.new_rewards, vec!["first-quiz", "perfect-quiz"]);
        assert_eq!(outcome.ledger.progress.completed_levels, vec!["level-1"]);

        let retry = submit_quiz(&store, user.id, roadmap.id, "level-1", &[0, 0, 0]).await.unwrap();
        assert!(!retry.perfect);
        assert_eq!(retry.ledger.xp_gained, 0);
        assert!(retry.ledger.new_rewards.is_empty());
        assert_eq!(retry.ledger.progress.quiz_results.len(), 1);
        assert_eq!(retry.ledger.progress.quiz_results[0].score, 1);
    }

    #[tokio::test]
    async fn three_started_roadmaps_unlock_explorer() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let mut last = None;
        for topic in ["Rust", "Go", "Zig"] {
            let roadmap = fixture::roadmap(&store, user.id, topic).await;
            last = Some(complete_level(&store, user.id, roadmap.id, "level-1").await.unwrap());
        }
        let outcome = last.unwrap();
        assert_eq!(outcome.user.xp, 300);
        assert_eq!(outcome.new_rewards, vec!["three-roadmaps"]);
    }

    #[tokio::test]
    async fn concurrent_completions_keep_both_credits() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;

        let (a, b) = tokio::join!(
            complete_level(&store, user.id, roadmap.id, "level-1"),
            complete_level(&store, user.id, roadmap.id, "level-2"),
        );
        assert_eq!(a.unwrap().xp_gained + b.unwrap().xp_gained, 250);

        let stored = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.xp, 250);
        let progress = store.get_progress(user.id, roadmap.id).await.unwrap().unwrap();
        let mut completed = progress.completed_levels.clone();
        completed.sort();
        assert_eq!(completed, vec!["level-1", "level-2"]);
    }

    #[tokio::test]
    async fn concurrent_repeat_credits_once() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;

        let (a, b) = tokio::join!(
            complete_level(&store, user.id, roadmap.id, "level-3"),
            complete_level(&store, user.id, roadmap.id, "level-3"),
        );
        assert_eq!(a.unwrap().xp_gained + b.unwrap().xp_gained, 200);
        assert_eq!(store.get_user(user.id).await.unwrap().unwrap().xp, 200);
    }

    #[tokio::test]
    async fn failed_lookup_writes_nothing() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;

        let err = submit_quiz(&store, user.id, roadmap.id, "level-1", &[0]).await.unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
        assert!(store.get_progress(user.id, roadmap.id).await.unwrap().is_none());
    }
}
