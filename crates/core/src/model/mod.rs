mod achievement;
mod activity;
mod completion;
mod course;
mod ids;
mod lesson;
mod module;
mod profile;
mod settings;
mod user_progress;
mod vocabulary;

pub use ids::{
    AchievementId, ActivityId, CourseId, LessonId, ModuleId, ParseIdError, ProgressId, UserId,
    VocabularyId,
};

pub use achievement::{Achievement, AchievementError, NewAchievement};
pub use activity::{Activity, ActivityKind, COURSE_COMPLETION_POINTS, NewActivity};
pub use completion::LessonCompletion;
pub use course::{Course, CourseDraft, CourseError};
pub use lesson::{Lesson, LessonDraft, LessonError, LessonType, parse_video_url};
pub use module::{Module, ModuleDraft, ModuleError};
pub use profile::{Profile, ProfileUpdate};
pub use settings::{InterfaceLanguage, SettingsError, SettingsUpdate, UserSettings};
pub use user_progress::{
    NewProgressRecord, ProgressPatch, UserProgress, UserProgressError, next_streak,
    percentage_from_i64,
};
pub use vocabulary::{Vocabulary, VocabularyDraft, VocabularyError, sort_by_term};
