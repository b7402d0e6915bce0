use course_core::model::{Activity, ActivityId, NewActivity, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, map_activity_row};
use crate::repository::{ActivityRepository, StorageError};

#[async_trait::async_trait]
impl ActivityRepository for SqliteRepository {
    async fn append_activity(&self, activity: NewActivity) -> Result<Activity, StorageError> {
        let stored = activity.assign_id(ActivityId::random());

        sqlx::query(
            r"
            INSERT INTO activities (id, user_id, activity_type, title, points, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(stored.id.value())
        .bind(stored.user_id.value())
        .bind(stored.kind.as_str())
        .bind(stored.title.as_str())
        .bind(i64::from(stored.points))
        .bind(stored.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(stored)
    }

    async fn list_activities(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Activity>, StorageError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, i64::from);
        let rows = sqlx::query(
            r"
            SELECT id, user_id, activity_type, title, points, created_at
            FROM activities
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            ",
        )
        .bind(user_id.value())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_activity_row).collect()
    }
}
