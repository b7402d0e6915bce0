//! `SQLite` backend for the course catalog and learner state.
//!
//! One `SqliteRepository` implements every repository trait over a shared
//! pool. Cascading deletes and the (user, lesson) and (user, course)
//! uniqueness rules live in the schema, see `migrate`.

use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod achievement_repo;
mod activity_repo;
mod blob_repo;
mod completion_repo;
mod course_repo;
mod lesson_repo;
mod mapping;
mod migrate;
mod module_repo;
mod profile_repo;
mod progress_repo;
mod settings_repo;
mod vocabulary_repo;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Open a pool on `database_url`.
    ///
    /// Every connection enables foreign keys so deleting a course removes its
    /// modules, lessons, vocabulary and progress rows. WAL and a busy timeout
    /// let a progress write wait out a concurrent completion write.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the course player schema up to the latest version.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a schema statement fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Course player storage on `SQLite`, migrated and ready to use.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self::from_repository(repo))
    }
}
