use course_core::model::{
    CourseId, NewProgressRecord, ProgressId, ProgressPatch, UserId, UserProgress,
};

use super::SqliteRepository;
use super::mapping::{db_err, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = "id, user_id, course_id, progress_percentage, lessons_completed, hours_studied, current_streak, last_accessed";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn find_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = ?1 AND course_id = ?2"
        ))
        .bind(user_id.value())
        .bind(course_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn insert_progress(
        &self,
        record: NewProgressRecord,
    ) -> Result<UserProgress, StorageError> {
        let id = ProgressId::random();
        let values = record.values;

        // The (user_id, course_id) unique index turns a racing second insert into Conflict.
        sqlx::query(
            r"
            INSERT INTO user_progress (id, user_id, course_id, progress_percentage, lessons_completed, hours_studied, current_streak, last_accessed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id.value())
        .bind(record.user_id.value())
        .bind(record.course_id.value())
        .bind(i64::from(values.progress_percentage))
        .bind(i64::from(values.lessons_completed))
        .bind(i64::from(values.hours_studied))
        .bind(i64::from(values.current_streak))
        .bind(values.last_accessed)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(UserProgress {
            id,
            user_id: record.user_id,
            course_id: record.course_id,
            progress_percentage: values.progress_percentage,
            lessons_completed: values.lessons_completed,
            hours_studied: values.hours_studied,
            current_streak: values.current_streak,
            last_accessed: values.last_accessed,
        })
    }

    async fn update_progress(
        &self,
        id: ProgressId,
        patch: ProgressPatch,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE user_progress
            SET progress_percentage = ?2,
                lessons_completed = ?3,
                hours_studied = ?4,
                current_streak = ?5,
                last_accessed = ?6
            WHERE id = ?1
            ",
        )
        .bind(id.value())
        .bind(i64::from(patch.progress_percentage))
        .bind(i64::from(patch.lessons_completed))
        .bind(i64::from(patch.hours_studied))
        .bind(i64::from(patch.current_streak))
        .bind(patch.last_accessed)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = ?1 ORDER BY last_accessed DESC, id ASC"
        ))
        .bind(user_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_progress_row).collect()
    }
}
