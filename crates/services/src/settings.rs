use std::sync::Arc;

use tracing::info;

use course_core::Clock;
use course_core::model::{SettingsUpdate, UserId, UserSettings};
use storage::repository::{SettingsRepository, Storage};

use crate::error::SettingsServiceError;

/// Loads and saves a learner's notification and language preferences.
#[derive(Clone)]
pub struct SettingsService {
    clock: Clock,
    settings: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    #[must_use]
    pub fn new(clock: Clock, settings: Arc<dyn SettingsRepository>) -> Self {
        Self { clock, settings }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(clock, Arc::clone(&storage.settings))
    }

    /// Stored settings, or the defaults when the learner never saved any.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError::Storage` if the lookup fails.
    pub async fn load(&self, user_id: UserId) -> Result<UserSettings, SettingsServiceError> {
        Ok(self
            .settings
            .get_settings(user_id)
            .await?
            .unwrap_or_else(|| UserSettings::defaults(user_id, self.clock.now())))
    }

    /// Apply `update` on top of the current settings and store the result.
    ///
    /// # Errors
    ///
    /// Returns `SettingsServiceError::Storage` if the read or write fails.
    pub async fn save(
        &self,
        user_id: UserId,
        update: SettingsUpdate,
    ) -> Result<UserSettings, SettingsServiceError> {
        let mut settings = self.load(user_id).await?;
        settings.apply(update, self.clock.now());
        self.settings.upsert_settings(&settings).await?;
        info!(
            %user_id,
            language = %settings.interface_language,
            reminders = settings.progress_reminders,
            alerts = settings.new_content_alerts,
            "settings saved"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::InterfaceLanguage;
    use course_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn unsaved_settings_load_as_defaults() {
        let repo = InMemoryRepository::new();
        let service = SettingsService::from_storage(fixed_clock(), &Storage::from_repository(repo.clone()));
        let user = UserId::random();

        let settings = service.load(user).await.unwrap();
        assert!(settings.progress_reminders);
        assert!(!settings.new_content_alerts);
        assert_eq!(settings.interface_language, InterfaceLanguage::English);
        assert!(repo.get_settings(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_merges_and_overwrites_one_row() {
        let repo = InMemoryRepository::new();
        let mut clock = fixed_clock();
        let user = UserId::random();

        SettingsService::new(clock, Arc::new(repo.clone()))
            .save(
                user,
                SettingsUpdate {
                    interface_language: Some(InterfaceLanguage::Turkish),
                    ..SettingsUpdate::default()
                },
            )
            .await
            .unwrap();

        clock.advance(chrono::Duration::minutes(5));
        let service = SettingsService::new(clock, Arc::new(repo.clone()));
        let saved = service
            .save(
                user,
                SettingsUpdate {
                    progress_reminders: Some(false),
                    ..SettingsUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(saved.interface_language, InterfaceLanguage::Turkish);
        assert!(!saved.progress_reminders);
        assert_eq!(saved.updated_at, fixed_now() + chrono::Duration::minutes(5));
        assert_eq!(service.load(user).await.unwrap(), saved);
    }
}
