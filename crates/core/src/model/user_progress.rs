use chrono::{DateTime, Days, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, ProgressId, UserId};
use crate::progress::ProgressStats;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserProgressError {
    #[error("progress percentage must be within 0..=100, got {0}")]
    PercentageOutOfRange(i64),
}

/// Stored progress for one (user, course) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProgress {
    pub id: ProgressId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub progress_percentage: u8,
    pub lessons_completed: u32,
    pub hours_studied: u32,
    pub current_streak: u32,
    pub last_accessed: DateTime<Utc>,
}

impl UserProgress {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress_percentage >= 100
    }
}

/// Checks a raw percentage read back from storage.
///
/// # Errors
///
/// Returns `UserProgressError::PercentageOutOfRange` outside `0..=100`.
pub fn percentage_from_i64(raw: i64) -> Result<u8, UserProgressError> {
    u8::try_from(raw)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or(UserProgressError::PercentageOutOfRange(raw))
}

/// Consecutive study days after activity at `now`.
///
/// `previous` is the stored streak and the time it was last touched. Activity on
/// the same UTC day keeps the streak, the following day extends it, and any gap
/// starts over at one.
#[must_use]
pub fn next_streak(previous: Option<(u32, DateTime<Utc>)>, now: DateTime<Utc>) -> u32 {
    let Some((streak, last)) = previous else {
        return 1;
    };
    let today = now.date_naive();
    let last_day = last.date_naive();
    if last_day >= today {
        streak.max(1)
    } else if last_day.checked_add_days(Days::new(1)) == Some(today) {
        streak.saturating_add(1)
    } else {
        1
    }
}

/// Values written on insert or update of a progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPatch {
    pub progress_percentage: u8,
    pub lessons_completed: u32,
    pub hours_studied: u32,
    pub current_streak: u32,
    pub last_accessed: DateTime<Utc>,
}

impl ProgressPatch {
    #[must_use]
    pub fn from_stats(stats: &ProgressStats, last_accessed: DateTime<Utc>) -> Self {
        Self {
            progress_percentage: stats.completion_percentage,
            lessons_completed: stats.completed_lessons.min(stats.total_lessons),
            hours_studied: stats.hours_studied,
            current_streak: 1,
            last_accessed,
        }
    }

    #[must_use]
    pub fn with_streak(mut self, current_streak: u32) -> Self {
        self.current_streak = current_streak;
        self
    }
}

/// Insert payload for a progress record that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewProgressRecord {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub values: ProgressPatch,
}
