use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::CourseId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("course field cannot be empty")]
    EmptyField,
}

/// A course for one professional field (e.g. "IT", "HVAC").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    field: String,
    icon: Option<String>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a course after trimming and validating title and field.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the title or field is blank.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        field: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        let field = field.into().trim().to_owned();
        if field.is_empty() {
            return Err(CourseError::EmptyField);
        }

        Ok(Self {
            id,
            title,
            description: normalize_optional(description),
            field,
            icon: None,
            created_at,
        })
    }

    #[must_use]
    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = normalize_optional(icon);
        self
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Admin-side input for creating or editing a course.
///
/// `id == None` creates a new course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDraft {
    pub id: Option<CourseId>,
    pub title: String,
    pub description: Option<String>,
    pub field: String,
    pub icon: Option<String>,
}

impl CourseDraft {
    /// # Errors
    ///
    /// Returns `CourseError` if the draft does not form a valid course.
    pub fn validate(self, now: DateTime<Utc>) -> Result<Course, CourseError> {
        let id = self.id.unwrap_or_else(CourseId::random);
        Ok(Course::new(id, self.title, self.description, self.field, now)?.with_icon(self.icon))
    }
}

pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
