//! Shared error types for the services crate.

use thiserror::Error;

use storage::identity::IdentityError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CourseTreeLoader`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseTreeError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressPersister`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CoursePlayer`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayerError {
    #[error(transparent)]
    Tree(#[from] CourseTreeError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionContext`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionContextError {
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("avatar is {0} bytes, the limit is 2 MB")]
    AvatarTooLarge(usize),
    #[error("avatar file name has no extension: {0}")]
    AvatarNameInvalid(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AdminService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminError {
    #[error("admin access required")]
    NotAdmin,
    #[error(transparent)]
    Invalid(#[from] course_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while assembling `AppServices`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    SqliteInit(#[from] SqliteInitError),
}
