use crate::model::LessonId;
use crate::tree::CourseTree;

/// Current-lesson pointer over the flattened lesson sequence of a course.
///
/// The pointer never leaves `0..len`. Moving past either end is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonNavigator {
    order: Vec<LessonId>,
    current: Option<usize>,
}

impl LessonNavigator {
    #[must_use]
    pub fn new(order: Vec<LessonId>) -> Self {
        Self {
            order,
            current: None,
        }
    }

    #[must_use]
    pub fn from_tree(tree: &CourseTree) -> Self {
        Self::new(tree.lesson_ids())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn current(&self) -> Option<LessonId> {
        self.current.map(|i| self.order[i])
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Points at `id`. Returns `false` and leaves the pointer alone if the
    /// lesson is not part of this course.
    pub fn select(&mut self, id: LessonId) -> bool {
        match self.order.iter().position(|l| *l == id) {
            Some(index) => {
                self.current = Some(index);
                true
            }
            None => false,
        }
    }

    /// The lesson `next()` would move to, without moving.
    #[must_use]
    pub fn peek_next(&self) -> Option<LessonId> {
        let index = self.current?;
        self.order.get(index + 1).copied()
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current
            .is_some_and(|i| i + 1 == self.order.len())
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.current == Some(0)
    }

    /// Advances one lesson. Returns the new current lesson, or `None` when
    /// already at the end (or nothing is selected).
    pub fn next(&mut self) -> Option<LessonId> {
        let index = self.current?;
        if index + 1 >= self.order.len() {
            return None;
        }
        self.current = Some(index + 1);
        self.current()
    }

    /// Steps back one lesson. Returns `None` at the first lesson.
    pub fn previous(&mut self) -> Option<LessonId> {
        let index = self.current?;
        if index == 0 {
            return None;
        }
        self.current = Some(index - 1);
        self.current()
    }
}
