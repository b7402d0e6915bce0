//! Ordered course → module → lesson structure as shown in the course player.
//!
//! Modules are ordered by `order_index`, lessons by `order_index` within their
//! module. Equal indices fall back to ascending identifier so the order never
//! depends on how the data service happened to return rows.

use std::cmp::Ordering;

use crate::model::{Course, Lesson, LessonId, Module, ModuleId};

/// A lesson annotated with the viewer's completion flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonNode {
    lesson: Lesson,
    completed: bool,
}

impl LessonNode {
    #[must_use]
    pub fn new(lesson: Lesson, completed: bool) -> Self {
        Self { lesson, completed }
    }

    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.lesson.id()
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    module: Module,
    lessons: Vec<LessonNode>,
}

impl ModuleNode {
    /// Builds a module node, dropping lessons that belong to another module.
    #[must_use]
    pub fn new(module: Module, lessons: Vec<LessonNode>) -> Self {
        let mut lessons: Vec<_> = lessons
            .into_iter()
            .filter(|node| node.lesson.module_id() == module.id())
            .collect();
        lessons.sort_by(|a, b| lesson_order(&a.lesson, &b.lesson));
        Self { module, lessons }
    }

    #[must_use]
    pub fn module(&self) -> &Module {
        &self.module
    }

    #[must_use]
    pub fn lessons(&self) -> &[LessonNode] {
        &self.lessons
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.lessons.iter().filter(|l| l.completed).count()
    }
}

/// Total order used for sibling lessons.
#[must_use]
pub fn lesson_order(a: &Lesson, b: &Lesson) -> Ordering {
    a.order_index()
        .cmp(&b.order_index())
        .then_with(|| a.id().cmp(&b.id()))
}

/// Total order used for sibling modules.
#[must_use]
pub fn module_order(a: &Module, b: &Module) -> Ordering {
    a.order_index()
        .cmp(&b.order_index())
        .then_with(|| a.id().cmp(&b.id()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseTree {
    course: Course,
    modules: Vec<ModuleNode>,
}

impl CourseTree {
    /// Builds the tree, dropping modules that belong to another course.
    #[must_use]
    pub fn new(course: Course, modules: Vec<ModuleNode>) -> Self {
        let mut modules: Vec<_> = modules
            .into_iter()
            .filter(|node| node.module.course_id() == course.id())
            .collect();
        modules.sort_by(|a, b| module_order(&a.module, &b.module));
        Self { course, modules }
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn modules(&self) -> &[ModuleNode] {
        &self.modules
    }

    /// Lessons in display order: module order first, then lesson order.
    pub fn lessons(&self) -> impl Iterator<Item = &LessonNode> + '_ {
        self.modules.iter().flat_map(|m| m.lessons.iter())
    }

    #[must_use]
    pub fn lesson_ids(&self) -> Vec<LessonId> {
        self.lessons().map(LessonNode::id).collect()
    }

    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lesson_count() == 0
    }

    #[must_use]
    pub fn lesson(&self, id: LessonId) -> Option<&LessonNode> {
        self.lessons().find(|l| l.id() == id)
    }

    /// The module containing `lesson_id`, i.e. the one the sidebar keeps expanded.
    #[must_use]
    pub fn module_of(&self, lesson_id: LessonId) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|m| m.lessons.iter().any(|l| l.id() == lesson_id))
            .map(|m| m.module.id())
    }

    /// First lesson not yet completed, or the very first lesson when all are done.
    #[must_use]
    pub fn resume_lesson(&self) -> Option<LessonId> {
        self.lessons()
            .find(|l| !l.completed)
            .or_else(|| self.lessons().next())
            .map(LessonNode::id)
    }

    /// Sets the completion flag of a lesson.
    ///
    /// Returns `true` only if the flag changed, so repeated calls are harmless.
    pub fn mark_completed(&mut self, id: LessonId) -> bool {
        for module in &mut self.modules {
            if let Some(node) = module.lessons.iter_mut().find(|l| l.id() == id) {
                let changed = !node.completed;
                node.completed = true;
                return changed;
            }
        }
        false
    }
}
