use async_trait::async_trait;
use course_core::model::{
    Achievement, AchievementId, Activity, ActivityId, Course, CourseId, Lesson, LessonCompletion,
    LessonId, Module, ModuleId, NewAchievement, NewActivity, NewProgressRecord, Profile,
    ProgressId, ProgressPatch, UserId, UserProgress, UserSettings, Vocabulary, VocabularyId,
    sort_by_term,
};
use course_core::tree::{lesson_order, module_order};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result of recording a lesson completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionInsert {
    Inserted,
    /// A record for (user, lesson) already existed; nothing was written.
    AlreadyRecorded,
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID. Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Resolve a professional field name to its course.
    ///
    /// When several courses share a field the oldest one wins (ties by id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn find_course_by_field(&self, field: &str) -> Result<Option<Course>, StorageError>;

    /// All courses ordered by field, then title.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Delete a course together with its modules, lessons and vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the parent course is missing.
    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError>;

    /// Modules of a course ordered by `order_index`, then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the module does not exist.
    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the parent module is missing.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Lessons of a module ordered by `order_index`, then id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the parent lesson is missing.
    async fn upsert_vocabulary(&self, entry: &Vocabulary) -> Result<(), StorageError>;

    /// Entries of a lesson ordered by term.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_vocabulary(&self, lesson_id: LessonId) -> Result<Vec<Vocabulary>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the entry does not exist.
    async fn delete_vocabulary(&self, id: VocabularyId) -> Result<(), StorageError>;
}

//
// ─── LEARNER STATE ─────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Whether `user_id` has completed `lesson_id`. A missing record is `false`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn has_completion(&self, user_id: UserId, lesson_id: LessonId)
    -> Result<bool, StorageError>;

    /// Record a completion, ignoring the write if one already exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn record_completion(
        &self,
        completion: &LessonCompletion,
    ) -> Result<CompletionInsert, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn find_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<UserProgress>, StorageError>;

    /// Insert a new progress record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a record for (user, course) already exists.
    async fn insert_progress(&self, record: NewProgressRecord)
    -> Result<UserProgress, StorageError>;

    /// Overwrite the values of an existing record, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn update_progress(&self, id: ProgressId, patch: ProgressPatch)
    -> Result<(), StorageError>;

    /// Every progress record of a learner, most recently accessed first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_activity(&self, activity: NewActivity) -> Result<Activity, StorageError>;

    /// Newest first, optionally limited.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_activities(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Activity>, StorageError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError>;
}

#[async_trait]
pub trait AchievementRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the achievement cannot be stored.
    async fn award_achievement(
        &self,
        achievement: NewAchievement,
    ) -> Result<Achievement, StorageError>;

    /// Newest first, optionally limited.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_achievements(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Achievement>, StorageError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Returns `Ok(None)` until the learner saves settings for the first time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_settings(&self, user_id: UserId) -> Result<Option<UserSettings>, StorageError>;

    /// Insert or replace the single settings row of a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_settings(&self, settings: &UserSettings) -> Result<(), StorageError>;
}

//
// ─── FILES ─────────────────────────────────────────────────────────────────────
//

/// Bucket holding profile pictures.
pub const AVATAR_BUCKET: &str = "avatars";

/// Public address of an object, as stored on the profile.
#[must_use]
pub fn public_url(bucket: &str, path: &str) -> String {
    format!("/storage/{bucket}/{path}")
}

/// Named binary objects grouped in buckets.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, replacing any previous object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the object cannot be stored.
    async fn put_object(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_object(&self, bucket: &str, path: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Removing a missing object succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn remove_object(&self, bucket: &str, path: &str) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    courses: HashMap<CourseId, Course>,
    modules: HashMap<ModuleId, Module>,
    lessons: HashMap<LessonId, Lesson>,
    vocabulary: HashMap<VocabularyId, Vocabulary>,
    completions: HashMap<(UserId, LessonId), LessonCompletion>,
    progress: HashMap<ProgressId, UserProgress>,
    activities: Vec<Activity>,
    profiles: HashMap<UserId, Profile>,
    achievements: Vec<Achievement>,
    settings: HashMap<UserId, UserSettings>,
    blobs: HashMap<(String, String), Vec<u8>>,
}

impl MemoryState {
    fn remove_lessons(&mut self, lesson_ids: &HashSet<LessonId>) {
        self.lessons.retain(|id, _| !lesson_ids.contains(id));
        self.vocabulary
            .retain(|_, v| !lesson_ids.contains(&v.lesson_id()));
    }

    fn remove_modules(&mut self, module_ids: &HashSet<ModuleId>) {
        let lesson_ids: HashSet<_> = self
            .lessons
            .values()
            .filter(|l| module_ids.contains(&l.module_id()))
            .map(Lesson::id)
            .collect();
        self.remove_lessons(&lesson_ids);
        self.modules.retain(|id, _| !module_ids.contains(id));
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    /// Number of stored progress rows for (user, course). Used to assert on duplicates.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the state lock is poisoned.
    pub fn progress_rows(&self, user_id: UserId, course_id: CourseId) -> Result<usize, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .progress
            .values()
            .filter(|p| p.user_id == user_id && p.course_id == course_id)
            .count())
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.courses.get(&id).cloned())
    }

    async fn find_course_by_field(&self, field: &str) -> Result<Option<Course>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .courses
            .values()
            .filter(|c| c.field() == field)
            .min_by(|a, b| {
                a.created_at()
                    .cmp(&b.created_at())
                    .then_with(|| a.id().cmp(&b.id()))
            })
            .cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.lock()?;
        let mut courses: Vec<_> = guard.courses.values().cloned().collect();
        courses.sort_by(|a, b| {
            a.field()
                .cmp(b.field())
                .then_with(|| a.title().cmp(b.title()))
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(courses)
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.courses.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        let module_ids: HashSet<_> = guard
            .modules
            .values()
            .filter(|m| m.course_id() == id)
            .map(Module::id)
            .collect();
        guard.remove_modules(&module_ids);
        guard.progress.retain(|_, p| p.course_id != id);
        Ok(())
    }
}

#[async_trait]
impl ModuleRepository for InMemoryRepository {
    async fn upsert_module(&self, module: &Module) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.courses.contains_key(&module.course_id()) {
            return Err(StorageError::NotFound);
        }
        guard.modules.insert(module.id(), module.clone());
        Ok(())
    }

    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>, StorageError> {
        let guard = self.lock()?;
        let mut modules: Vec<_> = guard
            .modules
            .values()
            .filter(|m| m.course_id() == course_id)
            .cloned()
            .collect();
        modules.sort_by(module_order);
        Ok(modules)
    }

    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.remove_modules(&HashSet::from([id]));
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&lesson.module_id()) {
            return Err(StorageError::NotFound);
        }
        guard.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        let mut lessons: Vec<_> = guard
            .lessons
            .values()
            .filter(|l| l.module_id() == module_id)
            .cloned()
            .collect();
        lessons.sort_by(lesson_order);
        Ok(lessons)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.remove_lessons(&HashSet::from([id]));
        Ok(())
    }
}

#[async_trait]
impl VocabularyRepository for InMemoryRepository {
    async fn upsert_vocabulary(&self, entry: &Vocabulary) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&entry.lesson_id()) {
            return Err(StorageError::NotFound);
        }
        guard.vocabulary.insert(entry.id(), entry.clone());
        Ok(())
    }

    async fn list_vocabulary(&self, lesson_id: LessonId) -> Result<Vec<Vocabulary>, StorageError> {
        let guard = self.lock()?;
        let mut entries: Vec<_> = guard
            .vocabulary
            .values()
            .filter(|v| v.lesson_id() == lesson_id)
            .cloned()
            .collect();
        sort_by_term(&mut entries);
        Ok(entries)
    }

    async fn delete_vocabulary(&self, id: VocabularyId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .vocabulary
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn has_completion(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<bool, StorageError> {
        let guard = self.lock()?;
        Ok(guard.completions.contains_key(&(user_id, lesson_id)))
    }

    async fn record_completion(
        &self,
        completion: &LessonCompletion,
    ) -> Result<CompletionInsert, StorageError> {
        let mut guard = self.lock()?;
        let key = (completion.user_id, completion.lesson_id);
        if guard.completions.contains_key(&key) {
            return Ok(CompletionInsert::AlreadyRecorded);
        }
        guard.completions.insert(key, completion.clone());
        Ok(CompletionInsert::Inserted)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn find_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .progress
            .values()
            .find(|p| p.user_id == user_id && p.course_id == course_id)
            .cloned())
    }

    async fn insert_progress(
        &self,
        record: NewProgressRecord,
    ) -> Result<UserProgress, StorageError> {
        let mut guard = self.lock()?;
        let exists = guard
            .progress
            .values()
            .any(|p| p.user_id == record.user_id && p.course_id == record.course_id);
        if exists {
            return Err(StorageError::Conflict);
        }
        let row = UserProgress {
            id: ProgressId::random(),
            user_id: record.user_id,
            course_id: record.course_id,
            progress_percentage: record.values.progress_percentage,
            lessons_completed: record.values.lessons_completed,
            hours_studied: record.values.hours_studied,
            current_streak: record.values.current_streak,
            last_accessed: record.values.last_accessed,
        };
        guard.progress.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_progress(
        &self,
        id: ProgressId,
        patch: ProgressPatch,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let row = guard.progress.get_mut(&id).ok_or(StorageError::NotFound)?;
        row.progress_percentage = patch.progress_percentage;
        row.lessons_completed = patch.lessons_completed;
        row.hours_studied = patch.hours_studied;
        row.current_streak = patch.current_streak;
        row.last_accessed = patch.last_accessed;
        Ok(())
    }

    async fn list_progress(&self, user_id: UserId) -> Result<Vec<UserProgress>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<_> = guard
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.last_accessed
                .cmp(&a.last_accessed)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rows)
    }
}

#[async_trait]
impl ActivityRepository for InMemoryRepository {
    async fn append_activity(&self, activity: NewActivity) -> Result<Activity, StorageError> {
        let mut guard = self.lock()?;
        let stored = activity.assign_id(ActivityId::random());
        guard.activities.push(stored.clone());
        Ok(stored)
    }

    async fn list_activities(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Activity>, StorageError> {
        let guard = self.lock()?;
        // Insertion order breaks timestamp ties so the newest append comes first.
        let mut rows: Vec<_> = guard
            .activities
            .iter()
            .enumerate()
            .filter(|(_, a)| a.user_id == user_id)
            .collect();
        rows.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then_with(|| ib.cmp(ia)));
        let limit = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(_, a)| a.clone())
            .collect())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.profiles.insert(profile.id, profile.clone());
        Ok(())
    }
}

#[async_trait]
impl AchievementRepository for InMemoryRepository {
    async fn award_achievement(
        &self,
        achievement: NewAchievement,
    ) -> Result<Achievement, StorageError> {
        let mut guard = self.lock()?;
        let stored = achievement.assign_id(AchievementId::random());
        guard.achievements.push(stored.clone());
        Ok(stored)
    }

    async fn list_achievements(
        &self,
        user_id: UserId,
        limit: Option<u32>,
    ) -> Result<Vec<Achievement>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<_> = guard
            .achievements
            .iter()
            .enumerate()
            .filter(|(_, a)| a.user_id == user_id)
            .collect();
        rows.sort_by(|(ia, a), (ib, b)| b.earned_at.cmp(&a.earned_at).then_with(|| ib.cmp(ia)));
        let limit = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(_, a)| a.clone())
            .collect())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn get_settings(&self, user_id: UserId) -> Result<Option<UserSettings>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.settings.get(&user_id).cloned())
    }

    async fn upsert_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.settings.insert(settings.user_id, settings.clone());
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryRepository {
    async fn put_object(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .blobs
            .insert((bucket.to_owned(), path.to_owned()), bytes.to_vec());
        Ok(())
    }

    async fn get_object(&self, bucket: &str, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .blobs
            .get(&(bucket.to_owned(), path.to_owned()))
            .cloned())
    }

    async fn remove_object(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.blobs.remove(&(bucket.to_owned(), path.to_owned()));
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub modules: Arc<dyn ModuleRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub vocabulary: Arc<dyn VocabularyRepository>,
    pub completions: Arc<dyn CompletionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub activities: Arc<dyn ActivityRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub achievements: Arc<dyn AchievementRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wires every repository slot to the same backing adapter.
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CourseRepository
            + ModuleRepository
            + LessonRepository
            + VocabularyRepository
            + CompletionRepository
            + ProgressRepository
            + ActivityRepository
            + ProfileRepository
            + AchievementRepository
            + SettingsRepository
            + BlobStore
            + Clone
            + 'static,
    {
        Self {
            courses: Arc::new(repo.clone()),
            modules: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            vocabulary: Arc::new(repo.clone()),
            completions: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            activities: Arc::new(repo.clone()),
            profiles: Arc::new(repo.clone()),
            achievements: Arc::new(repo.clone()),
            settings: Arc::new(repo.clone()),
            blobs: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::LessonType;
    use course_core::time::fixed_now;
    use uuid::Uuid;

    fn course(field: &str) -> Course {
        Course::new(CourseId::random(), format!("{field} English"), None, field, fixed_now())
            .unwrap()
    }

    fn lesson(module: &Module, order: i32) -> Lesson {
        Lesson::new(
            LessonId::random(),
            module.id(),
            "Lesson",
            "",
            LessonType::Quiz,
            None,
            order,
            10,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_completion_is_ignored() {
        let repo = InMemoryRepository::new();
        let completion = LessonCompletion::new(UserId::random(), LessonId::random(), fixed_now());
        assert_eq!(
            repo.record_completion(&completion).await.unwrap(),
            CompletionInsert::Inserted
        );
        assert_eq!(
            repo.record_completion(&completion).await.unwrap(),
            CompletionInsert::AlreadyRecorded
        );
        assert!(
            repo.has_completion(completion.user_id, completion.lesson_id)
                .await
                .unwrap()
        );
        assert!(
            !repo
                .has_completion(UserId::random(), completion.lesson_id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn second_progress_insert_conflicts() {
        let repo = InMemoryRepository::new();
        let record = NewProgressRecord {
            user_id: UserId::random(),
            course_id: CourseId::random(),
            values: ProgressPatch {
                progress_percentage: 0,
                lessons_completed: 0,
                hours_studied: 0,
                current_streak: 1,
                last_accessed: fixed_now(),
            },
        };
        repo.insert_progress(record).await.unwrap();
        assert!(matches!(
            repo.insert_progress(record).await,
            Err(StorageError::Conflict)
        ));
        assert_eq!(repo.progress_rows(record.user_id, record.course_id).unwrap(), 1);
    }

    #[tokio::test]
    async fn lessons_list_in_order_with_id_tie_break() {
        let repo = InMemoryRepository::new();
        let c = course("IT");
        repo.upsert_course(&c).await.unwrap();
        let m = Module::new(ModuleId::random(), c.id(), "Networking", None, 0).unwrap();
        repo.upsert_module(&m).await.unwrap();

        let a = Lesson::new(
            LessonId::new(Uuid::from_u128(2)),
            m.id(),
            "B",
            "",
            LessonType::Video,
            None,
            1,
            5,
        )
        .unwrap();
        let b = Lesson::new(
            LessonId::new(Uuid::from_u128(1)),
            m.id(),
            "A",
            "",
            LessonType::Video,
            None,
            1,
            5,
        )
        .unwrap();
        let first = lesson(&m, 0);
        for l in [&a, &b, &first] {
            repo.upsert_lesson(l).await.unwrap();
        }

        let ids: Vec<_> = repo
            .list_lessons(m.id())
            .await
            .unwrap()
            .iter()
            .map(Lesson::id)
            .collect();
        assert_eq!(ids, vec![first.id(), b.id(), a.id()]);
    }

    #[tokio::test]
    async fn deleting_course_cascades() {
        let repo = InMemoryRepository::new();
        let c = course("HVAC");
        repo.upsert_course(&c).await.unwrap();
        let m = Module::new(ModuleId::random(), c.id(), "Airflow", None, 0).unwrap();
        repo.upsert_module(&m).await.unwrap();
        let l = lesson(&m, 0);
        repo.upsert_lesson(&l).await.unwrap();

        repo.delete_course(c.id()).await.unwrap();
        assert!(repo.list_modules(c.id()).await.unwrap().is_empty());
        assert!(repo.list_lessons(m.id()).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_course(c.id()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn orphan_module_is_rejected() {
        let repo = InMemoryRepository::new();
        let m = Module::new(ModuleId::random(), CourseId::random(), "Loose", None, 0).unwrap();
        assert!(matches!(
            repo.upsert_module(&m).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn achievements_list_newest_first_with_limit() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        for (title, days_ago) in [("Old", 3), ("Newest", 0), ("Middle", 1)] {
            let earned = fixed_now() - chrono::Duration::days(days_ago);
            repo.award_achievement(NewAchievement::new(user, title, 10, earned).unwrap())
                .await
                .unwrap();
        }
        repo.award_achievement(NewAchievement::new(UserId::random(), "Other", 5, fixed_now()).unwrap())
            .await
            .unwrap();

        let titles: Vec<_> = repo
            .list_achievements(user, Some(2))
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Newest", "Middle"]);
        assert_eq!(repo.list_achievements(user, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn settings_upsert_replaces_row() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        assert!(repo.get_settings(user).await.unwrap().is_none());

        let mut settings = UserSettings::defaults(user, fixed_now());
        repo.upsert_settings(&settings).await.unwrap();
        settings.new_content_alerts = true;
        repo.upsert_settings(&settings).await.unwrap();

        assert_eq!(repo.get_settings(user).await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn blob_put_overwrites_and_remove_is_idempotent() {
        let repo = InMemoryRepository::new();
        repo.put_object(AVATAR_BUCKET, "u/avatar.png", b"one").await.unwrap();
        repo.put_object(AVATAR_BUCKET, "u/avatar.png", b"two").await.unwrap();
        assert_eq!(
            repo.get_object(AVATAR_BUCKET, "u/avatar.png").await.unwrap().as_deref(),
            Some(&b"two"[..])
        );

        repo.remove_object(AVATAR_BUCKET, "u/avatar.png").await.unwrap();
        repo.remove_object(AVATAR_BUCKET, "u/avatar.png").await.unwrap();
        assert!(repo.get_object(AVATAR_BUCKET, "u/avatar.png").await.unwrap().is_none());
    }
}
