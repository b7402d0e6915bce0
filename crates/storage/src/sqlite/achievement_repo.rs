use course_core::model::{Achievement, AchievementId, NewAchievement, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, map_achievement_row};
use crate::repository::{AchievementRepository, StorageError};

#[async_trait::async_trait]
impl AchievementRepository for SqliteRepository {
    async fn award_achievement(
        &self,
        achievement: NewAchievement,
    ) -> Result<Achievement, StorageError> {
        let stored = achievement.assign_id(AchievementId::random());

        sqlx::query(
            r"
            INSERT INTO achievements (id, user_id, title, description, icon, points_earned, earned_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(stored.id.value())
        .bind(stored.user_id.value())
        .bind(stored.title.as_str())
        .bind(stored.description.as_deref())
        .bind(stored.icon.as_deref())
        .bind(i64::from(stored.points_earned))
        .bind(stored.earned_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(stored)
    }

    async fn list_achievements(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Achievement>, StorageError> {
        let limit = limit.map_or(-1, i64::from);
        let rows = sqlx::query(
            r"
            SELECT id, user_id, title, description, icon, points_earned, earned_at
            FROM achievements
            WHERE user_id = ?1
            ORDER BY earned_at DESC, rowid DESC
            LIMIT ?2
            ",
        )
        .bind(user_id.value())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_achievement_row).collect()
    }
}
