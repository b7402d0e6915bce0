use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use course_core::model::{Course, CourseId, Lesson, UserId};
use course_core::tree::{CourseTree, LessonNode, ModuleNode};
use storage::repository::{
    CompletionRepository, CourseRepository, LessonRepository, ModuleRepository, Storage,
};

use crate::error::CourseTreeError;

/// Loads a course with its modules and lessons, annotated with the viewer's
/// completion status.
///
/// Loading is read-only. Per-module lesson fetches and per-lesson completion
/// checks run concurrently and are merged once all of them finished; any
/// failure fails the whole load.
#[derive(Clone)]
pub struct CourseTreeLoader {
    courses: Arc<dyn CourseRepository>,
    modules: Arc<dyn ModuleRepository>,
    lessons: Arc<dyn LessonRepository>,
    completions: Arc<dyn CompletionRepository>,
}

impl CourseTreeLoader {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        modules: Arc<dyn ModuleRepository>,
        lessons: Arc<dyn LessonRepository>,
        completions: Arc<dyn CompletionRepository>,
    ) -> Self {
        Self {
            courses,
            modules,
            lessons,
            completions,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.modules),
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.completions),
        )
    }

    /// Resolve a professional field to its course with a single lookup.
    ///
    /// # Errors
    ///
    /// Returns `CourseTreeError::Storage` if the lookup fails.
    pub async fn resolve_field(&self, field: &str) -> Result<Option<Course>, CourseTreeError> {
        let course = self.courses.find_course_by_field(field).await?;
        Ok(course)
    }

    /// Load the ordered tree of `course_id`.
    ///
    /// Returns `Ok(None)` when the course does not exist. Without a user every
    /// lesson is reported incomplete and no completion lookups are issued.
    ///
    /// # Errors
    ///
    /// Returns `CourseTreeError::Storage` if any module, lesson or completion
    /// fetch fails. No partial tree is returned.
    pub async fn load(
        &self,
        course_id: CourseId,
        user_id: Option<UserId>,
    ) -> Result<Option<CourseTree>, CourseTreeError> {
        let Some(course) = self.courses.get_course(course_id).await? else {
            debug!(%course_id, "course not found");
            return Ok(None);
        };

        let modules: Vec<_> = self
            .modules
            .list_modules(course_id)
            .await?
            .into_iter()
            .filter(|m| m.course_id() == course_id)
            .collect();

        let lesson_lists = try_join_all(
            modules
                .iter()
                .map(|module| self.lessons.list_lessons(module.id())),
        )
        .await?;

        let grouped: Vec<(_, Vec<Lesson>)> = modules
            .into_iter()
            .zip(lesson_lists)
            .map(|(module, lessons)| {
                let lessons = lessons
                    .into_iter()
                    .filter(|l| l.module_id() == module.id())
                    .collect();
                (module, lessons)
            })
            .collect();

        let flags = match user_id {
            Some(user_id) => {
                try_join_all(
                    grouped
                        .iter()
                        .flat_map(|(_, lessons)| lessons.iter())
                        .map(|lesson| self.completions.has_completion(user_id, lesson.id())),
                )
                .await?
            }
            None => Vec::new(),
        };

        let mut flags = flags.into_iter();
        let nodes = grouped
            .into_iter()
            .map(|(module, lessons)| {
                let lessons = lessons
                    .into_iter()
                    .map(|lesson| LessonNode::new(lesson, flags.next().unwrap_or(false)))
                    .collect();
                ModuleNode::new(module, lessons)
            })
            .collect();

        let tree = CourseTree::new(course, nodes);
        debug!(
            %course_id,
            modules = tree.modules().len(),
            lessons = tree.lesson_count(),
            "course tree loaded"
        );
        Ok(Some(tree))
    }
}
