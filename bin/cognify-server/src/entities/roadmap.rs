use crate::entities::dao::{Level, QuizQuestion, Roadmap, Subtopic};
use crate::entities::{SqliteStore, from_json, now, parse_ts, to_json};
use sqlx::SqliteExecutor;
use std::future::Future;

/// Fields of one level to overwrite; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct LevelPatch {
    pub theory_content: Option<String>,
    pub subtopics: Option<Vec<Subtopic>>,
    pub quiz: Option<Vec<QuizQuestion>>,
    /// `(subtopic id, content)`: body text for one existing subtopic, applied
    /// after `subtopics`.
    pub subtopic_content: Option<(String, String)>,
}

impl LevelPatch {
    pub fn is_empty(&self) -> bool {
        self.theory_content.is_none()
            && self.subtopics.is_none()
            && self.quiz.is_none()
            && self.subtopic_content.is_none()
    }

    /// `false` when the patch names a subtopic the level does not have.
    fn apply(self, level: &mut Level) -> bool {
        if let Some(theory) = self.theory_content {
            level.theory_content = theory;
        }
        if let Some(subtopics) = self.subtopics {
            level.subtopics = subtopics;
        }
        if let Some(quiz) = self.quiz {
            level.quiz = quiz;
        }
        match self.subtopic_content {
            Some((id, content)) => match level.subtopics.iter_mut().find(|s| s.id == id) {
                Some(subtopic) => {
                    subtopic.content = content;
                    true
                }
                None => false,
            },
            None => true,
        }
    }
}

pub trait RoadmapStore: Send + Sync + 'static {
    /// Insert a roadmap unless `(user_id, topic)` already exists; the flag is
    /// `true` when the existing row was returned instead.
    fn create_roadmap(
        &self,
        user_id: Option<i64>,
        client_id: Option<&str>,
        topic: &str,
        levels: &[Level],
    ) -> impl Future<Output = Result<(Roadmap, bool), sqlx::Error>> + Send;
    /// Topic comparison ignores case.
    fn find_roadmap_by_topic(
        &self,
        user_id: i64,
        topic: &str,
    ) -> impl Future<Output = Result<Option<Roadmap>, sqlx::Error>> + Send;
    fn get_roadmap(&self, id: i64) -> impl Future<Output = Result<Option<Roadmap>, sqlx::Error>> + Send;
    /// Newest first.
    fn list_roadmaps(&self, user_id: i64) -> impl Future<Output = Result<Vec<Roadmap>, sqlx::Error>> + Send;
    /// Progress rows go with it.
    fn delete_roadmap(&self, id: i64) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// Read-modify-write of one level inside a write transaction.  `None`
    /// when the roadmap, the level or a patched subtopic does not exist.
    fn update_level(
        &self,
        roadmap_id: i64,
        level_id: &str,
        patch: LevelPatch,
    ) -> impl Future<Output = Result<Option<Level>, sqlx::Error>> + Send;
}

type RoadmapRow = (i64, Option<i64>, Option<String>, String, String, String);

const ROADMAP_COLUMNS: &str = "id, user_id, client_id, topic, levels, created_at";

fn roadmap_from_row(row: RoadmapRow) -> Result<Roadmap, sqlx::Error> {
    let (id, user_id, client_id, topic, levels, created_at) = row;
    Ok(Roadmap {
        id,
        user_id,
        client_id,
        topic,
        levels: from_json(&levels)?,
        created_at: parse_ts(&created_at),
    })
}

pub(crate) async fn fetch_roadmap<'c>(
    executor: impl SqliteExecutor<'c>,
    id: i64,
) -> Result<Option<Roadmap>, sqlx::Error> {
    let row: Option<RoadmapRow> =
        sqlx::query_as(&format!("SELECT {ROADMAP_COLUMNS} FROM roadmaps WHERE id = ?1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
    row.map(roadmap_from_row).transpose()
}

impl RoadmapStore for SqliteStore {
    async fn create_roadmap(
        &self,
        user_id: Option<i64>,
        client_id: Option<&str>,
        topic: &str,
        levels: &[Level],
    ) -> Result<(Roadmap, bool), sqlx::Error> {
        let row: Option<RoadmapRow> = sqlx::query_as(&format!(
            "INSERT INTO roadmaps (user_id, client_id, topic, levels, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT (user_id, topic) DO NOTHING \
             RETURNING {ROADMAP_COLUMNS}"
        ))
        .bind(user_id)
        .bind(client_id)
        .bind(topic)
        .bind(to_json(levels)?)
        .bind(now())
        .fetch_optional(self.pool())
        .await?;

        if let Some(row) = row {
            return Ok((roadmap_from_row(row)?, false));
        }
        // Only a non-null user can conflict.
        let user_id = user_id.ok_or(sqlx::Error::RowNotFound)?;
        let existing = self
            .find_roadmap_by_topic(user_id, topic)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok((existing, true))
    }

    async fn find_roadmap_by_topic(
        &self,
        user_id: i64,
        topic: &str,
    ) -> Result<Option<Roadmap>, sqlx::Error> {
        let row: Option<RoadmapRow> = sqlx::query_as(&format!(
            "SELECT {ROADMAP_COLUMNS} FROM roadmaps WHERE user_id = ?1 AND topic = ?2"
        ))
        .bind(user_id)
        .bind(topic)
        .fetch_optional(self.pool())
        .await?;
        row.map(roadmap_from_row).transpose()
    }

    async fn get_roadmap(&self, id: i64) -> Result<Option<Roadmap>, sqlx::Error> {
        fetch_roadmap(self.pool(), id).await
    }

    async fn list_roadmaps(&self, user_id: i64) -> Result<Vec<Roadmap>, sqlx::Error> {
        let rows: Vec<RoadmapRow> = sqlx::query_as(&format!(
            "SELECT {ROADMAP_COLUMNS} FROM roadmaps WHERE user_id = ?1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(roadmap_from_row).collect()
    }

    async fn delete_roadmap(&self, id: i64) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("DELETE FROM roadmaps WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn update_level(
        &self,
        roadmap_id: i64,
        level_id: &str,
        patch: LevelPatch,
    ) -> Result<Option<Level>, sqlx::Error> {
        let mut tx = self.begin_write().await?;

        let raw: Option<(String,)> = sqlx::query_as("SELECT levels FROM roadmaps WHERE id = ?1")
            .bind(roadmap_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some((raw,)) = raw else {
            return Ok(None);
        };
        let mut levels: Vec<Level> = from_json(&raw)?;
        let Some(level) = levels.iter_mut().find(|l| l.id == level_id) else {
            return Ok(None);
        };
        if !patch.apply(level) {
            return Ok(None);
        }
        let updated = level.clone();

        sqlx::query("UPDATE roadmaps SET levels = ?1 WHERE id = ?2")
            .bind(to_json(&levels)?)
            .bind(roadmap_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{ProgressStore, fixture};

    #[tokio::test]
    async fn same_topic_returns_existing_row() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;

        let (first, existing) = store
            .create_roadmap(Some(user.id), None, "Rust", &fixture::levels(2))
            .await
            .unwrap();
        assert!(!existing);

        let (second, existing) = store
            .create_roadmap(Some(user.id), None, "rust", &fixture::levels(6))
            .await
            .unwrap();
        assert!(existing);
        assert_eq!(second.id, first.id);
        assert_eq!(second.levels.len(), 2);
        assert_eq!(store.list_roadmaps(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn anonymous_roadmaps_never_conflict() {
        let store = fixture::store().await;
        let (a, _) = store.create_roadmap(None, Some("c-1"), "Go", &[]).await.unwrap();
        let (b, existing) = store.create_roadmap(None, Some("c-2"), "Go", &[]).await.unwrap();
        assert!(!existing);
        assert_ne!(a.id, b.id);
        assert_eq!(b.client_id.as_deref(), Some("c-2"));
    }

    #[tokio::test]
    async fn level_patch_touches_only_given_fields() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;

        let patch = LevelPatch { theory_content: Some("Ownership!".into()), ..LevelPatch::default() };
        let level = store.update_level(roadmap.id, "level-2", patch).await.unwrap().unwrap();
        assert_eq!(level.theory_content, "Ownership!");
        assert_eq!(level.title, "Level 2");

        let reloaded = store.get_roadmap(roadmap.id).await.unwrap().unwrap();
        assert_eq!(reloaded.level("level-2").unwrap().theory_content, "Ownership!");
        assert!(reloaded.level("level-1").unwrap().theory_content.is_empty());

        let missing = store.update_level(roadmap.id, "level-9", LevelPatch::default()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn subtopic_content_patches_interleave() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;
        let subtopics = (0..2)
            .map(|i| Subtopic { id: format!("level-1-sub{i}"), title: format!("S{i}"), ..Subtopic::default() })
            .collect();
        let patch = LevelPatch { subtopics: Some(subtopics), ..LevelPatch::default() };
        store.update_level(roadmap.id, "level-1", patch).await.unwrap();

        let content = |id: &str, text: &str| LevelPatch {
            subtopic_content: Some((id.to_owned(), text.to_owned())),
            ..LevelPatch::default()
        };
        let (a, b) = tokio::join!(
            store.update_level(roadmap.id, "level-1", content("level-1-sub0", "first")),
            store.update_level(roadmap.id, "level-1", content("level-1-sub1", "second")),
        );
        assert!(a.unwrap().is_some() && b.unwrap().is_some());

        let reloaded = store.get_roadmap(roadmap.id).await.unwrap().unwrap();
        let level = reloaded.level("level-1").unwrap();
        assert_eq!(level.subtopics[0].content, "first");
        assert_eq!(level.subtopics[1].content, "second");

        let unknown = store
            .update_level(roadmap.id, "level-1", content("level-1-sub7", "lost"))
            .await
            .unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn deleting_roadmap_cascades_to_progress() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        let roadmap = fixture::roadmap(&store, user.id, "Rust").await;

        let mut progress = crate::entities::Progress::empty(user.id, roadmap.id);
        progress.completed_levels.push("level-1".into());
        store.save_progress(&progress).await.unwrap();
        assert!(store.get_progress(user.id, roadmap.id).await.unwrap().is_some());

        assert!(store.delete_roadmap(roadmap.id).await.unwrap());
        assert!(store.get_progress(user.id, roadmap.id).await.unwrap().is_none());
        assert!(store.list_progress(user.id).await.unwrap().is_empty());
        assert!(!store.delete_roadmap(roadmap.id).await.unwrap());
    }
}
