use course_core::model::{UserId, UserSettings};

use super::SqliteRepository;
use super::mapping::{db_err, map_settings_row};
use crate::repository::{SettingsRepository, StorageError};

#[async_trait::async_trait]
impl SettingsRepository for SqliteRepository {
    async fn get_settings(&self, user_id: UserId) -> Result<Option<UserSettings>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, progress_reminders, new_content_alerts, interface_language, updated_at
            FROM user_settings WHERE user_id = ?1
            ",
        )
        .bind(user_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_settings_row).transpose()
    }

    async fn upsert_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_settings (user_id, progress_reminders, new_content_alerts, interface_language, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                progress_reminders = excluded.progress_reminders,
                new_content_alerts = excluded.new_content_alerts,
                interface_language = excluded.interface_language,
                updated_at = excluded.updated_at
            ",
        )
        .bind(settings.user_id.value())
        .bind(i64::from(settings.progress_reminders))
        .bind(i64::from(settings.new_content_alerts))
        .bind(settings.interface_language.as_str())
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
