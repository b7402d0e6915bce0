use course_core::model::{LessonId, Vocabulary, VocabularyId, sort_by_term};

use super::SqliteRepository;
use super::mapping::{db_err, map_vocabulary_row};
use crate::repository::{StorageError, VocabularyRepository};

#[async_trait::async_trait]
impl VocabularyRepository for SqliteRepository {
    async fn upsert_vocabulary(&self, entry: &Vocabulary) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO vocabulary (id, lesson_id, term, definition, example_sentence, pronunciation)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                lesson_id = excluded.lesson_id,
                term = excluded.term,
                definition = excluded.definition,
                example_sentence = excluded.example_sentence,
                pronunciation = excluded.pronunciation
            ",
        )
        .bind(entry.id().value())
        .bind(entry.lesson_id().value())
        .bind(entry.term())
        .bind(entry.definition())
        .bind(entry.example_sentence())
        .bind(entry.pronunciation())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_vocabulary(&self, lesson_id: LessonId) -> Result<Vec<Vocabulary>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, term, definition, example_sentence, pronunciation
            FROM vocabulary
            WHERE lesson_id = ?1
            ",
        )
        .bind(lesson_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        // Case-insensitive ordering matches the in-memory adapter; COLLATE NOCASE is ASCII-only.
        let mut entries = rows
            .iter()
            .map(map_vocabulary_row)
            .collect::<Result<Vec<_>, _>>()?;
        sort_by_term(&mut entries);
        Ok(entries)
    }

    async fn delete_vocabulary(&self, id: VocabularyId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM vocabulary WHERE id = ?1")
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
