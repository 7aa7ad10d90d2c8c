use crate::entities::dao::CodeHistoryEntry;
use crate::entities::{SqliteStore, now, parse_ts};
use std::future::Future;

pub trait CodeHistoryStore: Send + Sync + 'static {
    fn save_code(
        &self,
        user_id: i64,
        language: &str,
        code: &str,
        stdin: &str,
        output: &str,
    ) -> impl Future<Output = Result<CodeHistoryEntry, sqlx::Error>> + Send;
    /// Newest first.
    fn list_code(
        &self,
        user_id: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<CodeHistoryEntry>, sqlx::Error>> + Send;
}

type CodeRow = (i64, i64, String, String, String, String, String);

fn entry_from_row((id, user_id, language, code, stdin, output, created_at): CodeRow) -> CodeHistoryEntry {
    CodeHistoryEntry { id, user_id, language, code, stdin, output, created_at: parse_ts(&created_at) }
}

impl CodeHistoryStore for SqliteStore {
    async fn save_code(
        &self,
        user_id: i64,
        language: &str,
        code: &str,
        stdin: &str,
        output: &str,
    ) -> Result<CodeHistoryEntry, sqlx::Error> {
        let row: CodeRow = sqlx::query_as(
            "INSERT INTO code_history (user_id, language, code, stdin, output, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING id, user_id, language, code, stdin, output, created_at",
        )
        .bind(user_id)
        .bind(language)
        .bind(code)
        .bind(stdin)
        .bind(output)
        .bind(now())
        .fetch_one(self.pool())
        .await?;
        Ok(entry_from_row(row))
    }

    async fn list_code(&self, user_id: i64, limit: i64) -> Result<Vec<CodeHistoryEntry>, sqlx::Error> {
        let rows: Vec<CodeRow> = sqlx::query_as(
            "SELECT id, user_id, language, code, stdin, output, created_at \
             FROM code_history WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(entry_from_row).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::fixture;

    #[tokio::test]
    async fn newest_first_with_limit() {
        let store = fixture::store().await;
        let user = fixture::user(&store, "g-1", "Ada").await;
        for i in 0..3 {
            store
                .save_code(user.id, "python", &format!("print({i})"), "", &i.to_string())
                .await
                .unwrap();
        }
        let listed = store.list_code(user.id, 2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].output, "2");
        assert_eq!(listed[1].code, "print(1)");
    }
}
