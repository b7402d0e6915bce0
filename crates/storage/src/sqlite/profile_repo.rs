use course_core::model::{Profile, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, map_profile_row};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, first_name, last_name, professional_field, avatar_url, is_admin, updated_at
            FROM profiles WHERE id = ?1
            ",
        )
        .bind(user_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (id, first_name, last_name, professional_field, avatar_url, is_admin, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                professional_field = excluded.professional_field,
                avatar_url = excluded.avatar_url,
                is_admin = excluded.is_admin,
                updated_at = excluded.updated_at
            ",
        )
        .bind(profile.id.value())
        .bind(profile.first_name.as_deref())
        .bind(profile.last_name.as_deref())
        .bind(profile.professional_field.as_deref())
        .bind(profile.avatar_url.as_deref())
        .bind(i64::from(profile.is_admin))
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
