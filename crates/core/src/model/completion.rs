use chrono::{DateTime, Utc};

use crate::model::ids::{LessonId, UserId};

/// Marks one lesson as finished by one learner.
///
/// The record's existence is the whole signal; there is no partial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonCompletion {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
}

impl LessonCompletion {
    #[must_use]
    pub fn new(user_id: UserId, lesson_id: LessonId, completed_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lesson_id,
            completed_at,
        }
    }
}
