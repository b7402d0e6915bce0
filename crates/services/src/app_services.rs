use std::sync::Arc;

use course_core::model::UserId;
use storage::identity::{IdentityProvider, InMemoryIdentity};
use storage::repository::Storage;

use crate::Clock;
use crate::admin::AdminService;
use crate::catalog::CatalogService;
use crate::dashboard::DashboardService;
use crate::error::AppServicesError;
use crate::player::CoursePlayer;
use crate::session::SessionContext;
use crate::settings::SettingsService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    session: Arc<SessionContext>,
    catalog: Arc<CatalogService>,
    dashboard: Arc<DashboardService>,
    settings: Arc<SettingsService>,
}

impl AppServices {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage, identity: Arc<dyn IdentityProvider>) -> Self {
        let session = Arc::new(SessionContext::from_storage(clock, identity, &storage));
        let catalog = Arc::new(CatalogService::from_storage(&storage));
        let dashboard = Arc::new(DashboardService::from_storage(&storage));
        let settings = Arc::new(SettingsService::from_storage(clock, &storage));
        Self {
            clock,
            storage,
            session,
            catalog,
            dashboard,
            settings,
        }
    }

    /// Build services backed by `SQLite` storage and a local identity provider.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let identity = InMemoryIdentity::new().with_profiles(Arc::clone(&storage.profiles), clock);
        Ok(Self::new(clock, storage, Arc::new(identity)))
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn session(&self) -> Arc<SessionContext> {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings)
    }

    /// A fresh player acting for `user_id`.
    #[must_use]
    pub fn player(&self, user_id: Option<UserId>) -> CoursePlayer {
        CoursePlayer::from_storage(self.clock, &self.storage).with_user(user_id)
    }

    #[must_use]
    pub fn admin(&self, acting_user: UserId) -> AdminService {
        AdminService::new(self.clock, &self.storage, acting_user)
    }
}
