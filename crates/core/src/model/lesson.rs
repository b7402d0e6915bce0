use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::model::ids::{LessonId, ModuleId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,

    #[error("unknown lesson type: {0}")]
    UnknownType(String),

    #[error("invalid video url: {0}")]
    InvalidVideoUrl(String),
}

//
// ─── LESSON TYPE ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LessonType {
    Video,
    Reading,
    Quiz,
    Exercise,
}

impl LessonType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonType::Video => "video",
            LessonType::Reading => "reading",
            LessonType::Quiz => "quiz",
            LessonType::Exercise => "exercise",
        }
    }
}

impl fmt::Display for LessonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonType {
    type Err = LessonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "video" => Ok(LessonType::Video),
            "reading" => Ok(LessonType::Reading),
            "quiz" => Ok(LessonType::Quiz),
            "exercise" => Ok(LessonType::Exercise),
            other => Err(LessonError::UnknownType(other.to_owned())),
        }
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single unit of study inside a module.
///
/// `duration_minutes` feeds study-hours accounting once the lesson is completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    module_id: ModuleId,
    title: String,
    content: String,
    lesson_type: LessonType,
    video_url: Option<Url>,
    order_index: i32,
    duration_minutes: u32,
}

impl Lesson {
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the title is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LessonId,
        module_id: ModuleId,
        title: impl Into<String>,
        content: impl Into<String>,
        lesson_type: LessonType,
        video_url: Option<Url>,
        order_index: i32,
        duration_minutes: u32,
    ) -> Result<Self, LessonError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(LessonError::EmptyTitle);
        }
        Ok(Self {
            id,
            module_id,
            title,
            content: content.into(),
            lesson_type,
            video_url,
            order_index,
            duration_minutes,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn lesson_type(&self) -> LessonType {
        self.lesson_type
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&Url> {
        self.video_url.as_ref()
    }

    #[must_use]
    pub fn order_index(&self) -> i32 {
        self.order_index
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }
}

/// Parses an optional video reference, treating blank input as absent.
///
/// # Errors
///
/// Returns `LessonError::InvalidVideoUrl` if the value is not an absolute URL.
pub fn parse_video_url(raw: Option<&str>) -> Result<Option<Url>, LessonError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Url::parse(s)
            .map(Some)
            .map_err(|_| LessonError::InvalidVideoUrl(s.to_owned())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDraft {
    pub id: Option<LessonId>,
    pub module_id: ModuleId,
    pub title: String,
    pub content: String,
    pub lesson_type: LessonType,
    pub video_url: Option<String>,
    pub order_index: i32,
    pub duration_minutes: u32,
}

impl LessonDraft {
    /// # Errors
    ///
    /// Returns `LessonError` for a blank title or a malformed video url.
    pub fn validate(self) -> Result<Lesson, LessonError> {
        let video_url = parse_video_url(self.video_url.as_deref())?;
        Lesson::new(
            self.id.unwrap_or_else(LessonId::random),
            self.module_id,
            self.title,
            self.content,
            self.lesson_type,
            video_url,
            self.order_index,
            self.duration_minutes,
        )
    }
}
