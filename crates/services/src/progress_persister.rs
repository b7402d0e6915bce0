use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use course_core::model::{
    Activity, Course, CourseId, NewActivity, NewProgressRecord, ProgressPatch, UserId,
    UserProgress, next_streak,
};
use course_core::{Clock, ProgressStats};
use storage::repository::{ActivityRepository, ProgressRepository, Storage, StorageError};

use crate::error::ProgressError;

type ProgressKey = (UserId, CourseId);

/// What a reconciliation wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub progress: UserProgress,
    /// `true` when the record did not exist before this call.
    pub created: bool,
    /// The completion entry appended on the transition into 100%.
    pub completion_activity: Option<Activity>,
}

/// Keeps the single `user_progress` record of a (user, course) pair in line
/// with computed stats.
///
/// Calls for the same pair are serialized in-process. A conflicting insert
/// from another writer is treated as "the record appeared": it is re-read and
/// updated instead.
#[derive(Clone)]
pub struct ProgressPersister {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    activities: Arc<dyn ActivityRepository>,
    in_flight: Arc<Mutex<HashMap<ProgressKey, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ProgressPersister {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        activities: Arc<dyn ActivityRepository>,
    ) -> Self {
        Self {
            clock,
            progress,
            activities,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.activities),
        )
    }

    /// Write `stats` into the progress record of (`user_id`, `course`).
    ///
    /// Inserts the record when absent and updates it in place otherwise.
    /// Re-running with unchanged stats only moves `last_accessed` (and the
    /// study streak on a new day). On the transition from below 100% (or no record) to 100% exactly one
    /// completion activity is appended.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if any lookup or write fails.
    pub async fn reconcile(
        &self,
        user_id: UserId,
        course: &Course,
        stats: &ProgressStats,
    ) -> Result<ReconcileOutcome, ProgressError> {
        let key = (user_id, course.id());
        let slot = self.slot(key)?;
        let result = {
            let _serialized = slot.lock().await;
            self.reconcile_locked(user_id, course, stats).await
        };
        self.release(key, &slot);
        result
    }

    async fn reconcile_locked(
        &self,
        user_id: UserId,
        course: &Course,
        stats: &ProgressStats,
    ) -> Result<ReconcileOutcome, ProgressError> {
        let course_id = course.id();
        let patch = ProgressPatch::from_stats(stats, self.clock.now());

        let (progress, previous, created) =
            match self.progress.find_progress(user_id, course_id).await? {
                Some(existing) => {
                    let previous = existing.progress_percentage;
                    (self.update(existing, patch).await?, Some(previous), false)
                }
                None => {
                    let record = NewProgressRecord {
                        user_id,
                        course_id,
                        values: patch,
                    };
                    match self.progress.insert_progress(record).await {
                        Ok(inserted) => (inserted, None, true),
                        Err(StorageError::Conflict) => {
                            warn!(%user_id, %course_id, "progress record appeared concurrently; updating it");
                            let existing = self
                                .progress
                                .find_progress(user_id, course_id)
                                .await?
                                .ok_or(StorageError::Conflict)?;
                            let previous = existing.progress_percentage;
                            (self.update(existing, patch).await?, Some(previous), false)
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            };

        let crossed = previous.is_none_or(|p| p < 100) && patch.progress_percentage == 100;
        let completion_activity = if crossed {
            let appended = self
                .activities
                .append_activity(NewActivity::course_completed(user_id, course, patch.last_accessed))
                .await;
            match appended {
                Ok(activity) => {
                    info!(%user_id, %course_id, "course completed");
                    Some(activity)
                }
                Err(e) => {
                    self.roll_back(&progress, previous.unwrap_or(0)).await;
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        Ok(ReconcileOutcome {
            progress,
            created,
            completion_activity,
        })
    }

    async fn update(
        &self,
        mut existing: UserProgress,
        patch: ProgressPatch,
    ) -> Result<UserProgress, ProgressError> {
        let streak = next_streak(
            Some((existing.current_streak, existing.last_accessed)),
            patch.last_accessed,
        );
        let patch = patch.with_streak(streak);
        self.progress.update_progress(existing.id, patch).await?;
        existing.progress_percentage = patch.progress_percentage;
        existing.lessons_completed = patch.lessons_completed;
        existing.hours_studied = patch.hours_studied;
        existing.current_streak = patch.current_streak;
        existing.last_accessed = patch.last_accessed;
        Ok(existing)
    }

    /// Put the percentage seen before this call back, so the next
    /// reconciliation crosses into 100% again and retries the activity.
    async fn roll_back(&self, progress: &UserProgress, previous_percentage: u8) {
        let patch = ProgressPatch {
            progress_percentage: previous_percentage,
            lessons_completed: progress.lessons_completed,
            hours_studied: progress.hours_studied,
            current_streak: progress.current_streak,
            last_accessed: progress.last_accessed,
        };
        if let Err(e) = self.progress.update_progress(progress.id, patch).await {
            warn!(
                user_id = %progress.user_id,
                course_id = %progress.course_id,
                error = %e,
                "failed to roll back progress after completion activity failed"
            );
        }
    }

    fn slot(&self, key: ProgressKey) -> Result<Arc<tokio::sync::Mutex<()>>, ProgressError> {
        let mut map = self
            .in_flight
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Arc::clone(map.entry(key).or_default()))
    }

    fn release(&self, key: ProgressKey, slot: &Arc<tokio::sync::Mutex<()>>) {
        if let Ok(mut map) = self.in_flight.lock() {
            // Only the map and this caller hold the slot: nobody is waiting on it.
            if Arc::strong_count(slot) == 2 {
                map.remove(&key);
            }
        }
    }
}
