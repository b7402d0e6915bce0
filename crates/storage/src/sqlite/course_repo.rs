use course_core::model::{Course, CourseId};

use super::SqliteRepository;
use super::mapping::{db_err, map_course_row};
use crate::repository::{CourseRepository, StorageError};

const COURSE_COLUMNS: &str = "id, title, description, field, icon, created_at";

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, description, field, icon, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                field = excluded.field,
                icon = excluded.icon
            ",
        )
        .bind(course.id().value())
        .bind(course.title())
        .bind(course.description())
        .bind(course.field())
        .bind(course.icon())
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn find_course_by_field(&self, field: &str) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE field = ?1 ORDER BY created_at ASC, id ASC LIMIT 1"
        ))
        .bind(field)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY field ASC, title ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_course_row).collect()
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM courses WHERE id = ?1")
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
