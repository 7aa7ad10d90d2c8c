use crate::entities::dao::Progress;
use crate::entities::{SqliteStore, from_json, now, parse_ts, to_json};
use sqlx::SqliteExecutor;
use std::future::Future;

pub trait ProgressStore: Send + Sync + 'static {
    fn get_progress(
        &self,
        user_id: i64,
        roadmap_id: i64,
    ) -> impl Future<Output = Result<Option<Progress>, sqlx::Error>> + Send;
    fn list_progress(&self, user_id: i64) -> impl Future<Output = Result<Vec<Progress>, sqlx::Error>> + Send;
    /// Upsert on `(user_id, roadmap_id)`, replacing both lists.
    fn save_progress(&self, progress: &Progress) -> impl Future<Output = Result<Progress, sqlx::Error>> + Send;
    /// Roadmaps in which the user completed at least one level.
    fn count_started_roadmaps(&self, user_id: i64) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
}

type ProgressRow = (i64, i64, i64, String, String, String);

const PROGRESS_COLUMNS: &str = "id, user_id, roadmap_id, completed_levels, quiz_results, updated_at";

fn progress_from_row(row: ProgressRow) -> Result<Progress, sqlx::Error> {
    let (id, user_id, roadmap_id, completed_levels, quiz_results, updated_at) = row;
    Ok(Progress {
        id,
        user_id,
        roadmap_id,
        completed_levels: from_json(&completed_levels)?,
        quiz_results: from_json(&quiz_results)?,
        updated_at: parse_ts(&updated_at),
    })
}

pub(crate) async fn fetch_progress<'c>(
    executor: impl SqliteExecutor<'c>,
    user_id: i64,
    roadmap_id: i64,
) -> Result<Option<Progress>, sqlx::Error> {
    let row: Option<ProgressRow> = sqlx::query_as(&format!(
        "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = ?1 AND roadmap_id = ?2"
    ))
    .bind(user_id)
    .bind(roadmap_id)
    .fetch_optional(executor)
    .await?;
    row.map(progress_from_row).transpose()
}

pub(crate) async fn upsert_progress<'c>(
    executor: impl SqliteExecutor<'c>,
    progress: &Progress,
) -> Result<Progress, sqlx::Error> {
    let row: ProgressRow = sqlx::query_as(&format!(
        "INSERT INTO user_progress (user_id, roadmap_id, completed_levels, quiz_results, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (user_id, roadmap_id) DO UPDATE SET \
           completed_levels = excluded.completed_levels, \
           quiz_results = excluded.quiz_results, updated_at = excluded.updated_at \
         RETURNING {PROGRESS_COLUMNS}"
    ))
    .bind(progress.user_id)
    .bind(progress.roadmap_id)
    .bind(to_json(&progress.completed_levels)?)
    .bind(to_json(&progress.quiz_results)?)
    .bind(now())
    .fetch_one(executor)
    .await?;
    progress_from_row(row)
}

pub(crate) async fn count_started<'c>(
    executor: impl SqliteExecutor<'c>,
    user_id: i64,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM user_progress \
         WHERE user_id = ?1 AND json_array_length(completed_levels) > 0",
    )
    .bind(user_id)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

impl ProgressStore for SqliteStore {
    async fn get_progress(&self, user_id: i64, roadmap_id: i64) -> Result<Option<Progress>, sqlx::Error> {
        fetch_progress(self.pool(), user_id, roadmap_id).await
    }

    async fn list_progress(&self, user_id: i64) -> Result<Vec<Progress>, sqlx::Error> {
        let rows: Vec<ProgressRow> = sqlx::query_as(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = ?1 ORDER BY roadmap_id"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(progress_from_row).collect()
    }

    async fn save_progress(&self, progress: &Progress) -> Result<Progress, sqlx::Error> {
        upsert_progress(self.pool(), progress).await
    }

    async fn count_started_roadmaps(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        count_started(self.pool(), user_id).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{QuizResult, fixture};

    #[tokio::test]
    async fn save_is_an_upsert() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;

        let mut progress = Progress::empty(user.id, roadmap.id);
        let first = store.save_progress(&progress).await.unwrap();
        assert!(first.completed_levels.is_empty());
        assert_eq!(store.count_started_roadmaps(user.id).await.unwrap(), 0);

        progress.completed_levels.push("level-1".into());
        progress.quiz_results.push(QuizResult {
            level_id: "level-1".into(),
            score: 4,
            total: 5,
            answers: vec![0, 1, 2, 3, -1],
            submitted_at: "2026-01-01T00:00:00+00:00".into(),
        });
        let second = store.save_progress(&progress).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.quiz_results[0].answers[4], -1);
        assert_eq!(store.count_started_roadmaps(user.id).await.unwrap(), 1);
        assert_eq!(store.list_progress(user.id).await.unwrap().len(), 1);
    }
}
