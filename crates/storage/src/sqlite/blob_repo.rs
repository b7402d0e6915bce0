use chrono::Utc;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, ser};
use crate::repository::{BlobStore, StorageError};

#[async_trait::async_trait]
impl BlobStore for SqliteRepository {
    async fn put_object(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO blobs (bucket, path, content, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(bucket, path) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at
            ",
        )
        .bind(bucket)
        .bind(path)
        .bind(bytes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_object(&self, bucket: &str, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let row = sqlx::query("SELECT content FROM blobs WHERE bucket = ?1 AND path = ?2")
            .bind(bucket)
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|r| r.try_get::<Vec<u8>, _>("content").map_err(ser))
            .transpose()
    }

    async fn remove_object(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM blobs WHERE bucket = ?1 AND path = ?2")
            .bind(bucket)
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}
