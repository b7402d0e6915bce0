use thiserror::Error;

use crate::model::{
    AchievementError, CourseError, LessonError, ModuleError, ParseIdError, SettingsError,
    UserProgressError, VocabularyError,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
    #[error(transparent)]
    Progress(#[from] UserProgressError),
    #[error(transparent)]
    Achievement(#[from] AchievementError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
