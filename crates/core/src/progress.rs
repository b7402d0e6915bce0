//! Aggregate progress over a course tree. Pure and deterministic; never does I/O.

use serde::Serialize;

use crate::tree::{CourseTree, LessonNode};

/// Counts and ratios shown in the course sidebar and stored in `user_progress`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressStats {
    pub total_lessons: u32,
    pub completed_lessons: u32,
    pub completion_percentage: u8,
    pub hours_studied: u32,
}

impl ProgressStats {
    #[must_use]
    pub fn from_tree(tree: &CourseTree) -> Self {
        Self::from_lessons(tree.lessons())
    }

    /// Computes stats from lesson nodes.
    ///
    /// Each node is counted once, so a lesson with several completion records
    /// upstream still contributes a single completed lesson.
    pub fn from_lessons<'a>(lessons: impl IntoIterator<Item = &'a LessonNode>) -> Self {
        let mut total: u64 = 0;
        let mut completed: u64 = 0;
        let mut minutes: u64 = 0;

        for node in lessons {
            total += 1;
            if node.completed() {
                completed += 1;
                minutes += u64::from(node.lesson().duration_minutes());
            }
        }

        let total_lessons = u32::try_from(total).unwrap_or(u32::MAX);
        let completed_lessons = u32::try_from(completed).unwrap_or(u32::MAX);

        Self {
            total_lessons,
            completed_lessons,
            completion_percentage: completion_percentage(completed_lessons, total_lessons),
            hours_studied: whole_hours(minutes),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completion_percentage == 100
    }
}

/// `round(100 * completed / total)` with halves rounded up; 0 for an empty course.
///
/// `completed` is clamped to `total`.
#[must_use]
pub fn completion_percentage(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    let pct = (200 * completed + total) / (2 * total);
    u8::try_from(pct).unwrap_or(100)
}

/// Whole hours in `minutes`; partial hours are dropped.
#[must_use]
pub fn whole_hours(minutes: u64) -> u32 {
    u32::try_from(minutes / 60).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::it_basics;
    use proptest::prelude::*;

    #[test]
    fn empty_course_is_zero_percent() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(3, 0), 0);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(1, 2), 50);
        assert_eq!(completion_percentage(3, 3), 100);
    }

    #[test]
    fn hours_are_floored() {
        assert_eq!(whole_hours(150), 2);
        assert_eq!(whole_hours(59), 0);
        assert_eq!(whole_hours(60), 1);
    }

    #[test]
    fn it_basics_walkthrough() {
        let fresh = ProgressStats::from_tree(&it_basics(&[]));
        assert_eq!(fresh.total_lessons, 3);
        assert_eq!(fresh.completion_percentage, 0);
        assert_eq!(fresh.hours_studied, 0);

        let partial = ProgressStats::from_tree(&it_basics(&[1, 2]));
        assert_eq!(partial.completed_lessons, 2);
        assert_eq!(partial.completion_percentage, 67);
        assert_eq!(partial.hours_studied, 1);

        let done = ProgressStats::from_tree(&it_basics(&[1, 2, 3]));
        assert_eq!(done.completion_percentage, 100);
        assert_eq!(done.hours_studied, 2);
        assert!(done.is_complete());
    }

    #[test]
    fn same_tree_gives_same_stats() {
        let tree = it_basics(&[2]);
        assert_eq!(ProgressStats::from_tree(&tree), ProgressStats::from_tree(&tree));
    }

    proptest! {
        #[test]
        fn percentage_stays_in_bounds(total in 0u32..10_000, completed in 0u32..10_000) {
            let pct = completion_percentage(completed, total);
            prop_assert!(pct <= 100);
            if total > 0 {
                let c = f64::from(completed.min(total));
                let expected = (100.0 * c / f64::from(total) + 0.5).floor();
                prop_assert_eq!(f64::from(pct), expected);
            }
        }
    }
}
