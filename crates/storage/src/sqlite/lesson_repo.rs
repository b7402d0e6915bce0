use course_core::model::{Lesson, LessonId, ModuleId};

use super::SqliteRepository;
use super::mapping::{db_err, map_lesson_row};
use crate::repository::{LessonRepository, StorageError};

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, module_id, title, content, lesson_type, video_url, order_index, duration_minutes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                module_id = excluded.module_id,
                title = excluded.title,
                content = excluded.content,
                lesson_type = excluded.lesson_type,
                video_url = excluded.video_url,
                order_index = excluded.order_index,
                duration_minutes = excluded.duration_minutes
            ",
        )
        .bind(lesson.id().value())
        .bind(lesson.module_id().value())
        .bind(lesson.title())
        .bind(lesson.content())
        .bind(lesson.lesson_type().as_str())
        .bind(lesson.video_url().map(ToString::to_string))
        .bind(i64::from(lesson.order_index()))
        .bind(i64::from(lesson.duration_minutes()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, module_id, title, content, lesson_type, video_url, order_index, duration_minutes
            FROM lessons
            WHERE module_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(module_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_lesson_row).collect()
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM lessons WHERE id = ?1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
