use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id BLOB PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            field TEXT NOT NULL,
            icon TEXT,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS modules (
            id BLOB PRIMARY KEY,
            course_id BLOB NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            order_index INTEGER NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lessons (
            id BLOB PRIMARY KEY,
            module_id BLOB NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            lesson_type TEXT NOT NULL
                CHECK (lesson_type IN ('video', 'reading', 'quiz', 'exercise')),
            video_url TEXT,
            order_index INTEGER NOT NULL,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes >= 0),
            FOREIGN KEY (module_id) REFERENCES modules(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS vocabulary (
            id BLOB PRIMARY KEY,
            lesson_id BLOB NOT NULL,
            term TEXT NOT NULL,
            definition TEXT NOT NULL,
            example_sentence TEXT,
            pronunciation TEXT,
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lesson_completions (
            id INTEGER PRIMARY KEY,
            user_id BLOB NOT NULL,
            lesson_id BLOB NOT NULL,
            completed_at TEXT NOT NULL,
            UNIQUE (user_id, lesson_id),
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_progress (
            id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            course_id BLOB NOT NULL,
            progress_percentage INTEGER NOT NULL
                CHECK (progress_percentage BETWEEN 0 AND 100),
            lessons_completed INTEGER NOT NULL CHECK (lessons_completed >= 0),
            hours_studied INTEGER NOT NULL CHECK (hours_studied >= 0),
            last_accessed TEXT NOT NULL,
            UNIQUE (user_id, course_id),
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS activities (
            id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            activity_type TEXT NOT NULL,
            title TEXT NOT NULL,
            points INTEGER NOT NULL CHECK (points >= 0),
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS profiles (
            id BLOB PRIMARY KEY,
            first_name TEXT,
            last_name TEXT,
            professional_field TEXT,
            avatar_url TEXT,
            is_admin INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_courses_field_created
            ON courses (field, created_at, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_modules_course_order
            ON modules (course_id, order_index, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_lessons_module_order
            ON lessons (module_id, order_index, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_vocabulary_lesson
            ON vocabulary (lesson_id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_activities_user_created
            ON activities (user_id, created_at);
    ",
];

const SCHEMA_V2: &[&str] = &[
    r"
        ALTER TABLE user_progress
            ADD COLUMN current_streak INTEGER NOT NULL DEFAULT 0;
    ",
    r"
        CREATE TABLE IF NOT EXISTS achievements (
            id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            icon TEXT,
            points_earned INTEGER NOT NULL CHECK (points_earned >= 0),
            earned_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_settings (
            user_id BLOB PRIMARY KEY,
            progress_reminders INTEGER NOT NULL,
            new_content_alerts INTEGER NOT NULL,
            interface_language TEXT NOT NULL
                CHECK (interface_language IN ('English', 'Turkish')),
            updated_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS blobs (
            bucket TEXT NOT NULL,
            path TEXT NOT NULL,
            content BLOB NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (bucket, path)
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_achievements_user_earned
            ON achievements (user_id, earned_at);
    ",
];

const MIGRATIONS: &[(i64, &[&str])] = &[(1, SCHEMA_V1), (2, SCHEMA_V2)];

/// Applies every schema version not yet recorded in `schema_migrations`.
///
/// Uniqueness on (user, lesson) completions and (user, course) progress is
/// enforced here so duplicate writes surface as conflicts.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    for &(version, statements) in MIGRATIONS {
        if is_applied(pool, version).await? {
            continue;
        }
        let mut tx = pool.begin().await?;

        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
