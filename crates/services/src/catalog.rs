use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;

use course_core::model::{Course, Lesson};
use storage::repository::{CourseRepository, LessonRepository, ModuleRepository, Storage};

use crate::error::CatalogError;

/// One course as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub course: Course,
    pub module_count: u32,
    pub lesson_count: u32,
    pub total_minutes: u64,
}

impl CatalogEntry {
    /// Course length in tenths of an hour, rounded half up (`95` = 9.5 h).
    #[must_use]
    pub fn total_hours_tenths(&self) -> u64 {
        (self.total_minutes * 10 + 30) / 60
    }
}

/// Read-only listing of every course with its size.
#[derive(Clone)]
pub struct CatalogService {
    courses: Arc<dyn CourseRepository>,
    modules: Arc<dyn ModuleRepository>,
    lessons: Arc<dyn LessonRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        modules: Arc<dyn ModuleRepository>,
        lessons: Arc<dyn LessonRepository>,
    ) -> Self {
        Self {
            courses,
            modules,
            lessons,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.modules),
            Arc::clone(&storage.lessons),
        )
    }

    /// Every course ordered by field, then title, with lesson totals.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if any fetch fails.
    pub async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let courses = self.courses.list_courses().await?;
        let entries = try_join_all(courses.into_iter().map(|course| self.entry(course))).await?;
        Ok(entries)
    }

    /// Catalog entries grouped by professional field.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if any fetch fails.
    pub async fn by_field(&self) -> Result<BTreeMap<String, Vec<CatalogEntry>>, CatalogError> {
        let mut grouped: BTreeMap<String, Vec<CatalogEntry>> = BTreeMap::new();
        for entry in self.list().await? {
            grouped
                .entry(entry.course.field().to_owned())
                .or_default()
                .push(entry);
        }
        Ok(grouped)
    }

    async fn entry(&self, course: Course) -> Result<CatalogEntry, CatalogError> {
        let modules = self.modules.list_modules(course.id()).await?;
        let lessons =
            try_join_all(modules.iter().map(|m| self.lessons.list_lessons(m.id()))).await?;

        let lessons: Vec<&Lesson> = lessons.iter().flatten().collect();
        Ok(CatalogEntry {
            module_count: u32::try_from(modules.len()).unwrap_or(u32::MAX),
            lesson_count: u32::try_from(lessons.len()).unwrap_or(u32::MAX),
            total_minutes: lessons
                .iter()
                .map(|l| u64::from(l.duration_minutes()))
                .sum(),
            course,
        })
    }
}
