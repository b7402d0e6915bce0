use thiserror::Error;

use crate::model::course::normalize_optional;
use crate::model::ids::{CourseId, ModuleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,
}

/// A chapter of a course. Sibling modules are ordered by `order_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    id: ModuleId,
    course_id: CourseId,
    title: String,
    description: Option<String>,
    order_index: i32,
}

impl Module {
    /// # Errors
    ///
    /// Returns `ModuleError::EmptyTitle` if the title is blank.
    pub fn new(
        id: ModuleId,
        course_id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        order_index: i32,
    ) -> Result<Self, ModuleError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(ModuleError::EmptyTitle);
        }
        Ok(Self {
            id,
            course_id,
            title,
            description: normalize_optional(description),
            order_index,
        })
    }

    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
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
    pub fn order_index(&self) -> i32 {
        self.order_index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDraft {
    pub id: Option<ModuleId>,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
}

impl ModuleDraft {
    /// # Errors
    ///
    /// Returns `ModuleError` if the draft does not form a valid module.
    pub fn validate(self) -> Result<Module, ModuleError> {
        Module::new(
            self.id.unwrap_or_else(ModuleId::random),
            self.course_id,
            self.title,
            self.description,
            self.order_index,
        )
    }
}
