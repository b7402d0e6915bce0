use course_core::model::{LessonCompletion, LessonId, UserId};

use super::SqliteRepository;
use super::mapping::db_err;
use crate::repository::{CompletionInsert, CompletionRepository, StorageError};

#[async_trait::async_trait]
impl CompletionRepository for SqliteRepository {
    async fn has_completion(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT 1 FROM lesson_completions WHERE user_id = ?1 AND lesson_id = ?2 LIMIT 1",
        )
        .bind(user_id.value())
        .bind(lesson_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.is_some())
    }

    async fn record_completion(
        &self,
        completion: &LessonCompletion,
    ) -> Result<CompletionInsert, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO lesson_completions (user_id, lesson_id, completed_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, lesson_id) DO NOTHING
            ",
        )
        .bind(completion.user_id.value())
        .bind(completion.lesson_id.value())
        .bind(completion.completed_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(if res.rows_affected() == 0 {
            CompletionInsert::AlreadyRecorded
        } else {
            CompletionInsert::Inserted
        })
    }
}
