use course_core::model::{
    Achievement, AchievementId, Activity, ActivityId, ActivityKind, Course, CourseId, Lesson,
    LessonId, LessonType, Module, ModuleId, Profile, ProgressId, UserId, UserProgress,
    UserSettings, Vocabulary, VocabularyId, parse_video_url, percentage_from_i64,
};
use sqlx::Row;
use sqlx::error::ErrorKind;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors, turning constraint violations into domain outcomes.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let Some(db) = e.as_database_error() {
        match db.kind() {
            ErrorKind::UniqueViolation => return StorageError::Conflict,
            ErrorKind::ForeignKeyViolation => return StorageError::NotFound,
            _ => {}
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i32_from_i64(field: &'static str, v: i64) -> Result<i32, StorageError> {
    i32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn uuid(row: &SqliteRow, column: &str) -> Result<Uuid, StorageError> {
    row.try_get::<Uuid, _>(column).map_err(ser)
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let icon: Option<String> = row.try_get("icon").map_err(ser)?;
    Course::new(
        CourseId::new(uuid(row, "id")?),
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        row.try_get::<String, _>("field").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map(|c| c.with_icon(icon))
    .map_err(ser)
}

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<Module, StorageError> {
    Module::new(
        ModuleId::new(uuid(row, "id")?),
        CourseId::new(uuid(row, "course_id")?),
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        i32_from_i64("order_index", row.try_get::<i64, _>("order_index").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    let lesson_type: LessonType = row
        .try_get::<String, _>("lesson_type")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let video_url = parse_video_url(
        row.try_get::<Option<String>, _>("video_url")
            .map_err(ser)?
            .as_deref(),
    )
    .map_err(ser)?;

    Lesson::new(
        LessonId::new(uuid(row, "id")?),
        ModuleId::new(uuid(row, "module_id")?),
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("content").map_err(ser)?,
        lesson_type,
        video_url,
        i32_from_i64("order_index", row.try_get::<i64, _>("order_index").map_err(ser)?)?,
        u32_from_i64(
            "duration_minutes",
            row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
        )?,
    )
    .map_err(ser)
}

pub(crate) fn map_vocabulary_row(row: &SqliteRow) -> Result<Vocabulary, StorageError> {
    Vocabulary::new(
        VocabularyId::new(uuid(row, "id")?),
        LessonId::new(uuid(row, "lesson_id")?),
        row.try_get::<String, _>("term").map_err(ser)?,
        row.try_get::<String, _>("definition").map_err(ser)?,
        row.try_get::<Option<String>, _>("example_sentence")
            .map_err(ser)?,
        row.try_get::<Option<String>, _>("pronunciation").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<UserProgress, StorageError> {
    Ok(UserProgress {
        id: ProgressId::new(uuid(row, "id")?),
        user_id: UserId::new(uuid(row, "user_id")?),
        course_id: CourseId::new(uuid(row, "course_id")?),
        progress_percentage: percentage_from_i64(
            row.try_get::<i64, _>("progress_percentage").map_err(ser)?,
        )
        .map_err(ser)?,
        lessons_completed: u32_from_i64(
            "lessons_completed",
            row.try_get::<i64, _>("lessons_completed").map_err(ser)?,
        )?,
        hours_studied: u32_from_i64(
            "hours_studied",
            row.try_get::<i64, _>("hours_studied").map_err(ser)?,
        )?,
        current_streak: u32_from_i64(
            "current_streak",
            row.try_get::<i64, _>("current_streak").map_err(ser)?,
        )?,
        last_accessed: row.try_get("last_accessed").map_err(ser)?,
    })
}

pub(crate) fn map_activity_row(row: &SqliteRow) -> Result<Activity, StorageError> {
    Ok(Activity {
        id: ActivityId::new(uuid(row, "id")?),
        user_id: UserId::new(uuid(row, "user_id")?),
        kind: ActivityKind::parse(&row.try_get::<String, _>("activity_type").map_err(ser)?),
        title: row.try_get("title").map_err(ser)?,
        points: u32_from_i64("points", row.try_get::<i64, _>("points").map_err(ser)?)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<Profile, StorageError> {
    Ok(Profile {
        id: UserId::new(uuid(row, "id")?),
        first_name: row.try_get("first_name").map_err(ser)?,
        last_name: row.try_get("last_name").map_err(ser)?,
        professional_field: row.try_get("professional_field").map_err(ser)?,
        avatar_url: row.try_get("avatar_url").map_err(ser)?,
        is_admin: row.try_get::<i64, _>("is_admin").map_err(ser)? != 0,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_achievement_row(row: &SqliteRow) -> Result<Achievement, StorageError> {
    Ok(Achievement {
        id: AchievementId::new(uuid(row, "id")?),
        user_id: UserId::new(uuid(row, "user_id")?),
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        icon: row.try_get("icon").map_err(ser)?,
        points_earned: u32_from_i64(
            "points_earned",
            row.try_get::<i64, _>("points_earned").map_err(ser)?,
        )?,
        earned_at: row.try_get("earned_at").map_err(ser)?,
    })
}

pub(crate) fn map_settings_row(row: &SqliteRow) -> Result<UserSettings, StorageError> {
    Ok(UserSettings {
        user_id: UserId::new(uuid(row, "user_id")?),
        progress_reminders: row.try_get::<i64, _>("progress_reminders").map_err(ser)? != 0,
        new_content_alerts: row.try_get::<i64, _>("new_content_alerts").map_err(ser)? != 0,
        interface_language: row
            .try_get::<String, _>("interface_language")
            .map_err(ser)?
            .parse()
            .map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}
