use course_core::model::{CourseId, Module, ModuleId};

use super::SqliteRepository;
use super::mapping::{db_err, map_module_row};
use crate::repository::{ModuleRepository, StorageError};

#[async_trait::async_trait]
impl ModuleRepository for SqliteRepository {
    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO modules (id, course_id, title, description, order_index)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                description = excluded.description,
                order_index = excluded.order_index
            ",
        )
        .bind(module.id().value())
        .bind(module.course_id().value())
        .bind(module.title())
        .bind(module.description())
        .bind(i64::from(module.order_index()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, description, order_index
            FROM modules
            WHERE course_id = ?1
            ORDER BY order_index ASC, id ASC
            ",
        )
        .bind(course_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_module_row).collect()
    }

    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM modules WHERE id = ?1")
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
