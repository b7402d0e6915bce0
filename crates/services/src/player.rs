//! Course player: loads a course for the signed-in learner, tracks the current
//! lesson and records completions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use course_core::model::{
    Course, CourseId, Lesson, LessonCompletion, LessonId, ModuleId, UserId, Vocabulary,
};
use course_core::{Clock, CourseTree, LessonNavigator, ProgressStats};
use storage::repository::{
    CompletionInsert, CompletionRepository, ProfileRepository, Storage, VocabularyRepository,
};

use crate::course_tree::CourseTreeLoader;
use crate::error::PlayerError;
use crate::progress_persister::ProgressPersister;

/// Identifies one load request. Only the most recently issued ticket may
/// change the player's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    course_id: CourseId,
    generation: u64,
}

impl LoadTicket {
    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// The tree was loaded and is now shown.
    Applied,
    /// No course matched; the player was cleared.
    Missing,
    /// A newer selection was made while this load was in flight; discarded.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// A new completion was written.
    Recorded { course_completed: bool },
    /// The lesson was already complete; counts are unchanged.
    AlreadyCompleted,
    /// No signed-in learner or no current lesson; nothing was written.
    Refused,
}

#[derive(Default)]
struct PlayerState {
    generation: u64,
    tree: Option<CourseTree>,
    navigator: LessonNavigator,
    stats: ProgressStats,
}

/// State holder for one course view.
///
/// All reads return snapshots. The state lock is never held across an await.
pub struct CoursePlayer {
    clock: Clock,
    user_id: Option<UserId>,
    loader: CourseTreeLoader,
    persister: ProgressPersister,
    completions: Arc<dyn CompletionRepository>,
    vocabulary: Arc<dyn VocabularyRepository>,
    profiles: Arc<dyn ProfileRepository>,
    state: Mutex<PlayerState>,
}

impl CoursePlayer {
    #[must_use]
    pub fn new(
        clock: Clock,
        loader: CourseTreeLoader,
        persister: ProgressPersister,
        completions: Arc<dyn CompletionRepository>,
        vocabulary: Arc<dyn VocabularyRepository>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            clock,
            user_id: None,
            loader,
            persister,
            completions,
            vocabulary,
            profiles,
            state: Mutex::new(PlayerState::default()),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            CourseTreeLoader::from_storage(storage),
            ProgressPersister::from_storage(clock, storage),
            Arc::clone(&storage.completions),
            Arc::clone(&storage.vocabulary),
            Arc::clone(&storage.profiles),
        )
    }

    /// Act on behalf of `user_id`. Without a user the player is read-only.
    #[must_use]
    pub fn with_user(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    fn state(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    /// Open the course of a professional field.
    ///
    /// `field` wins when given; otherwise the learner's profile preference is
    /// used. With neither, the player is left as is and `Missing` is returned.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if the profile, course lookup or tree load fails.
    pub async fn open_field(&self, field: Option<&str>) -> Result<LoadStatus, PlayerError> {
        let generation = self.bump_generation();

        let field = match field.map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) => Some(f.to_owned()),
            None => self.preferred_field().await?,
        };
        let Some(field) = field else {
            debug!("no field selected and no profile preference");
            return Ok(LoadStatus::Missing);
        };

        let Some(course) = self.loader.resolve_field(&field).await? else {
            debug!(%field, "no course for field");
            return Ok(self.apply_load_at(generation, None));
        };

        self.load(LoadTicket {
            course_id: course.id(),
            generation,
        })
        .await
    }

    /// Open a course by id.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Tree` if the load fails. The current state is kept.
    pub async fn open_course(&self, course_id: CourseId) -> Result<LoadStatus, PlayerError> {
        let ticket = self.begin_load(course_id);
        self.load(ticket).await
    }

    /// Issue a ticket for a new selection, invalidating every earlier one.
    pub fn begin_load(&self, course_id: CourseId) -> LoadTicket {
        LoadTicket {
            course_id,
            generation: self.bump_generation(),
        }
    }

    /// Install a loaded tree if `ticket` is still the latest selection.
    pub fn apply_load(&self, ticket: LoadTicket, tree: Option<CourseTree>) -> LoadStatus {
        let tree = tree.filter(|t| t.course().id() == ticket.course_id);
        self.apply_load_at(ticket.generation, tree)
    }

    fn bump_generation(&self) -> u64 {
        let mut state = self.state();
        state.generation += 1;
        state.generation
    }

    fn apply_load_at(&self, generation: u64, tree: Option<CourseTree>) -> LoadStatus {
        let mut state = self.state();
        if state.generation != generation {
            debug!(generation, current = state.generation, "discarding stale course load");
            return LoadStatus::Stale;
        }
        match tree {
            Some(tree) => {
                let mut navigator = LessonNavigator::from_tree(&tree);
                if let Some(resume) = tree.resume_lesson() {
                    navigator.select(resume);
                }
                state.stats = ProgressStats::from_tree(&tree);
                state.navigator = navigator;
                state.tree = Some(tree);
                LoadStatus::Applied
            }
            None => {
                state.tree = None;
                state.navigator = LessonNavigator::default();
                state.stats = ProgressStats::default();
                LoadStatus::Missing
            }
        }
    }

    async fn load(&self, ticket: LoadTicket) -> Result<LoadStatus, PlayerError> {
        let tree = self
            .loader
            .load(ticket.course_id, self.user_id)
            .await
            .inspect_err(|e| error!(course_id = %ticket.course_id, error = %e, "course load failed"))?;

        let status = self.apply_load(ticket, tree);
        if status == LoadStatus::Applied {
            self.persist_snapshot(ticket.generation).await;
        }
        Ok(status)
    }

    async fn preferred_field(&self) -> Result<Option<String>, PlayerError> {
        let Some(user_id) = self.user_id else {
            return Ok(None);
        };
        let profile = self.profiles.get_profile(user_id).await?;
        Ok(profile.and_then(|p| p.professional_field))
    }

    //
    // ─── COMPLETION ────────────────────────────────────────────────────────────
    //

    /// Mark the current lesson complete for the signed-in learner.
    ///
    /// Already completed lessons are not written again. Progress is then
    /// reconciled; a failure there is logged and does not undo the completion.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Storage` if the completion cannot be written. The
    /// lesson then stays incomplete.
    pub async fn mark_current_complete(&self) -> Result<CompletionOutcome, PlayerError> {
        let Some(user_id) = self.user_id else {
            debug!("completion ignored: no signed-in learner");
            return Ok(CompletionOutcome::Refused);
        };

        let (generation, lesson_id, already) = {
            let state = self.state();
            let Some(lesson_id) = state.navigator.current() else {
                debug!("completion ignored: no current lesson");
                return Ok(CompletionOutcome::Refused);
            };
            let already = state
                .tree
                .as_ref()
                .and_then(|t| t.lesson(lesson_id))
                .is_some_and(|l| l.completed());
            (state.generation, lesson_id, already)
        };
        if already {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        let completion = LessonCompletion::new(user_id, lesson_id, self.clock.now());
        let insert = self
            .completions
            .record_completion(&completion)
            .await
            .inspect_err(|e| error!(%user_id, %lesson_id, error = %e, "failed to record completion"))?;

        let still_current = {
            let mut guard = self.state();
            let state = &mut *guard;
            let current = state.generation == generation;
            if current {
                if let Some(tree) = state.tree.as_mut() {
                    tree.mark_completed(lesson_id);
                    state.stats = ProgressStats::from_tree(tree);
                }
            }
            current
        };

        let course_completed = still_current && self.persist_snapshot(generation).await;

        Ok(match insert {
            CompletionInsert::Inserted => {
                info!(%user_id, %lesson_id, "lesson completed");
                CompletionOutcome::Recorded { course_completed }
            }
            CompletionInsert::AlreadyRecorded => CompletionOutcome::AlreadyCompleted,
        })
    }

    /// Reconciles the current stats; returns whether the course was just completed.
    async fn persist_snapshot(&self, generation: u64) -> bool {
        let Some(user_id) = self.user_id else {
            return false;
        };
        let snapshot = {
            let state = self.state();
            state
                .tree
                .as_ref()
                .filter(|t| state.generation == generation && !t.is_empty())
                .map(|t| (t.course().clone(), state.stats))
        };
        let Some((course, stats)) = snapshot else {
            return false;
        };

        match self.persister.reconcile(user_id, &course, &stats).await {
            Ok(outcome) => outcome.completion_activity.is_some(),
            Err(e) => {
                error!(%user_id, course_id = %course.id(), error = %e, "failed to save progress");
                false
            }
        }
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Advance to the next lesson, completing the current one first if needed.
    ///
    /// A no-op at the last lesson.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Storage` if completing the current lesson fails;
    /// the pointer does not move then.
    pub async fn next(&self) -> Result<Option<LessonId>, PlayerError> {
        let (generation, completed) = {
            let state = self.state();
            let Some(current) = state.navigator.current() else {
                return Ok(None);
            };
            if state.navigator.is_last() {
                return Ok(None);
            }
            let completed = state
                .tree
                .as_ref()
                .and_then(|t| t.lesson(current))
                .is_some_and(|l| l.completed());
            (state.generation, completed)
        };

        if !completed {
            self.mark_current_complete().await?;
        }

        let mut state = self.state();
        if state.generation != generation {
            return Ok(None);
        }
        Ok(state.navigator.next())
    }

    /// Step back one lesson. A no-op at the first lesson.
    pub fn previous(&self) -> Option<LessonId> {
        self.state().navigator.previous()
    }

    /// Jump to a lesson of the open course. Unknown ids are ignored.
    pub fn select_lesson(&self, lesson_id: LessonId) -> bool {
        self.state().navigator.select(lesson_id)
    }

    //
    // ─── SNAPSHOTS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn course(&self) -> Option<Course> {
        self.state().tree.as_ref().map(|t| t.course().clone())
    }

    #[must_use]
    pub fn tree(&self) -> Option<CourseTree> {
        self.state().tree.clone()
    }

    #[must_use]
    pub fn stats(&self) -> ProgressStats {
        self.state().stats
    }

    #[must_use]
    pub fn current_lesson(&self) -> Option<Lesson> {
        let state = self.state();
        let id = state.navigator.current()?;
        state
            .tree
            .as_ref()
            .and_then(|t| t.lesson(id))
            .map(|node| node.lesson().clone())
    }

    #[must_use]
    pub fn current_completed(&self) -> bool {
        let state = self.state();
        state
            .navigator
            .current()
            .and_then(|id| state.tree.as_ref().and_then(|t| t.lesson(id)))
            .is_some_and(|l| l.completed())
    }

    /// The module holding the current lesson, kept expanded in the outline.
    #[must_use]
    pub fn expanded_module(&self) -> Option<ModuleId> {
        let state = self.state();
        let id = state.navigator.current()?;
        state.tree.as_ref().and_then(|t| t.module_of(id))
    }

    #[must_use]
    pub fn at_first_lesson(&self) -> bool {
        self.state().navigator.is_first()
    }

    #[must_use]
    pub fn at_last_lesson(&self) -> bool {
        self.state().navigator.is_last()
    }

    /// Vocabulary of the current lesson ordered by term. Empty without a
    /// current lesson.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Storage` if the entries cannot be fetched.
    pub async fn vocabulary(&self) -> Result<Vec<Vocabulary>, PlayerError> {
        let Some(lesson_id) = self.state().navigator.current() else {
            return Ok(Vec::new());
        };
        let entries = self.vocabulary.list_vocabulary(lesson_id).await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ItBasics, it_basics, lesson};
    use async_trait::async_trait;
    use course_core::model::{Module, Profile, ProgressId, UserProgress};
    use course_core::model::{NewProgressRecord, ProgressPatch};
    use course_core::time::fixed_now;
    use std::time::Duration;
    use storage::repository::{
        CourseRepository, InMemoryRepository, ProgressRepository, StorageError,
    };

    fn player(storage: &Storage, user: Option<UserId>) -> CoursePlayer {
        CoursePlayer::from_storage(Clock::fixed(fixed_now()), storage).with_user(user)
    }

    #[tokio::test]
    async fn it_basics_walkthrough() {
        let ItBasics { storage, repo, course, lessons, .. } = it_basics().await;
        let user = UserId::random();
        let player = player(&storage, Some(user));

        assert_eq!(player.open_course(course.id()).await.unwrap(), LoadStatus::Applied);
        assert_eq!(player.tree().unwrap().lesson_ids(), lessons.to_vec());
        assert_eq!(player.current_lesson().unwrap().id(), lessons[0]);
        let stats = player.stats();
        assert_eq!((stats.completed_lessons, stats.completion_percentage, stats.hours_studied), (0, 0, 0));
        assert_eq!(repo.progress_rows(user, course.id()).unwrap(), 1);

        assert_eq!(player.next().await.unwrap(), Some(lessons[1]));
        assert_eq!(player.next().await.unwrap(), Some(lessons[2]));
        let stats = player.stats();
        assert_eq!(stats.completed_lessons, 2);
        assert_eq!(stats.completion_percentage, 67);
        assert_eq!(stats.hours_studied, 1);

        // Last lesson: next is a no-op and completes nothing.
        assert_eq!(player.next().await.unwrap(), None);
        assert!(!player.current_completed());

        assert_eq!(
            player.mark_current_complete().await.unwrap(),
            CompletionOutcome::Recorded { course_completed: true }
        );
        let stats = player.stats();
        assert_eq!(stats.completion_percentage, 100);
        assert_eq!(stats.hours_studied, 2);

        let progress = storage.progress.find_progress(user, course.id()).await.unwrap().unwrap();
        assert_eq!(progress.progress_percentage, 100);
        assert_eq!(progress.lessons_completed, 3);
        assert_eq!(progress.hours_studied, 2);
        let activities = storage.activities.list_activities(user, None).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].title, "Completed IT course");
    }

    #[tokio::test]
    async fn completing_twice_changes_nothing() {
        let ItBasics { storage, course, .. } = it_basics().await;
        let user = UserId::random();
        let player = player(&storage, Some(user));
        player.open_course(course.id()).await.unwrap();

        assert!(matches!(
            player.mark_current_complete().await.unwrap(),
            CompletionOutcome::Recorded { course_completed: false }
        ));
        let before = player.stats();
        assert_eq!(
            player.mark_current_complete().await.unwrap(),
            CompletionOutcome::AlreadyCompleted
        );
        assert_eq!(player.stats(), before);
        assert_eq!(before.completed_lessons, 1);
        assert_eq!(before.completion_percentage, 33);
    }

    #[tokio::test]
    async fn two_lesson_course_emits_one_activity() {
        let ItBasics { storage, course, modules, lessons, .. } = it_basics().await;
        storage.lessons.delete_lesson(lessons[2]).await.unwrap();
        storage.modules.delete_module(modules[1]).await.unwrap();
        let user = UserId::random();
        let player = player(&storage, Some(user));
        player.open_course(course.id()).await.unwrap();

        player.mark_current_complete().await.unwrap();
        player.next().await.unwrap();
        player.mark_current_complete().await.unwrap();
        player.mark_current_complete().await.unwrap();
        player.previous();
        player.mark_current_complete().await.unwrap();

        let activities = storage.activities.list_activities(user, None).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].points, 100);
    }

    #[tokio::test]
    async fn anonymous_or_empty_player_refuses_completion() {
        let ItBasics { storage, course, .. } = it_basics().await;

        let anonymous = player(&storage, None);
        anonymous.open_course(course.id()).await.unwrap();
        assert_eq!(
            anonymous.mark_current_complete().await.unwrap(),
            CompletionOutcome::Refused
        );
        // Advancing still works without a learner.
        assert!(anonymous.next().await.unwrap().is_some());

        let idle = player(&storage, Some(UserId::random()));
        assert_eq!(
            idle.mark_current_complete().await.unwrap(),
            CompletionOutcome::Refused
        );
        assert_eq!(idle.next().await.unwrap(), None);
        assert_eq!(idle.previous(), None);
    }

    #[tokio::test]
    async fn resumes_at_first_incomplete_lesson() {
        let ItBasics { storage, course, lessons, modules, .. } = it_basics().await;
        let user = UserId::random();
        for id in &lessons[..2] {
            storage
                .completions
                .record_completion(&LessonCompletion::new(user, *id, fixed_now()))
                .await
                .unwrap();
        }

        let player = player(&storage, Some(user));
        player.open_course(course.id()).await.unwrap();
        assert_eq!(player.current_lesson().unwrap().id(), lessons[2]);
        assert_eq!(player.expanded_module(), Some(modules[1]));

        storage
            .completions
            .record_completion(&LessonCompletion::new(user, lessons[2], fixed_now()))
            .await
            .unwrap();
        player.open_course(course.id()).await.unwrap();
        assert_eq!(player.current_lesson().unwrap().id(), lessons[0]);
        assert!(player.at_first_lesson());
    }

    #[tokio::test]
    async fn navigation_stays_in_bounds() {
        let ItBasics { storage, course, lessons, .. } = it_basics().await;
        let player = player(&storage, None);
        player.open_course(course.id()).await.unwrap();

        assert_eq!(player.previous(), None);
        assert!(player.select_lesson(lessons[2]));
        assert!(player.at_last_lesson());
        assert!(!player.select_lesson(LessonId::random()));
        assert_eq!(player.current_lesson().unwrap().id(), lessons[2]);
        assert_eq!(player.previous(), Some(lessons[1]));
    }

    #[tokio::test]
    async fn field_defaults_to_profile_preference() {
        let ItBasics { storage, course, .. } = it_basics().await;
        let user = UserId::random();
        let mut profile = Profile::blank(user, fixed_now());
        profile.professional_field = Some("IT".into());
        storage.profiles.upsert_profile(&profile).await.unwrap();

        let player = player(&storage, Some(user));
        assert_eq!(player.open_field(None).await.unwrap(), LoadStatus::Applied);
        assert_eq!(player.course().unwrap().id(), course.id());

        assert_eq!(
            player.open_field(Some("Welding")).await.unwrap(),
            LoadStatus::Missing
        );
        assert!(player.course().is_none());
        assert!(player.current_lesson().is_none());

        let anonymous = self::player(&storage, None);
        assert_eq!(anonymous.open_field(None).await.unwrap(), LoadStatus::Missing);
    }

    #[tokio::test]
    async fn vocabulary_follows_current_lesson() {
        let ItBasics { storage, course, lessons, .. } = it_basics().await;
        let player = player(&storage, None);
        assert!(player.vocabulary().await.unwrap().is_empty());

        player.open_course(course.id()).await.unwrap();
        let terms: Vec<_> = player
            .vocabulary()
            .await
            .unwrap()
            .iter()
            .map(|v| v.term().to_owned())
            .collect();
        assert_eq!(terms, vec!["cable", "RAM"]);

        player.select_lesson(lessons[1]);
        assert!(player.vocabulary().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn superseded_ticket_is_discarded() {
        let ItBasics { storage, course, .. } = it_basics().await;
        let player = player(&storage, None);
        let loader = CourseTreeLoader::from_storage(&storage);

        let stale = player.begin_load(course.id());
        assert_eq!(player.open_course(course.id()).await.unwrap(), LoadStatus::Applied);

        let late_tree = loader.load(course.id(), None).await.unwrap();
        assert_eq!(player.apply_load(stale, late_tree), LoadStatus::Stale);
        assert_eq!(player.apply_load(stale, None), LoadStatus::Stale);
        assert!(player.course().is_some());
    }

    /// Delays `get_course` for one course so its load finishes last.
    struct SlowCourse {
        inner: InMemoryRepository,
        slow: CourseId,
    }

    #[async_trait]
    impl CourseRepository for SlowCourse {
        async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
            self.inner.upsert_course(course).await
        }

        async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
            if id == self.slow {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.get_course(id).await
        }

        async fn find_course_by_field(&self, field: &str) -> Result<Option<Course>, StorageError> {
            self.inner.find_course_by_field(field).await
        }

        async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
            self.inner.list_courses().await
        }

        async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
            self.inner.delete_course(id).await
        }
    }

    #[tokio::test]
    async fn slow_load_of_previous_selection_is_discarded() {
        let ItBasics { storage, repo, course, .. } = it_basics().await;
        let hvac = Course::new(CourseId::random(), "HVAC English", None, "HVAC", fixed_now()).unwrap();
        storage.courses.upsert_course(&hvac).await.unwrap();
        let m = Module::new(ModuleId::random(), hvac.id(), "Airflow", None, 0).unwrap();
        storage.modules.upsert_module(&m).await.unwrap();
        storage.lessons.upsert_lesson(&lesson(&m, "Ducts", 0, 20)).await.unwrap();

        let loader = CourseTreeLoader::new(
            Arc::new(SlowCourse {
                inner: repo.clone(),
                slow: course.id(),
            }),
            Arc::clone(&storage.modules),
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.completions),
        );
        let player = CoursePlayer::new(
            Clock::fixed(fixed_now()),
            loader,
            ProgressPersister::from_storage(Clock::fixed(fixed_now()), &storage),
            Arc::clone(&storage.completions),
            Arc::clone(&storage.vocabulary),
            Arc::clone(&storage.profiles),
        );

        let (first, second) = tokio::join!(player.open_course(course.id()), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            player.open_course(hvac.id()).await
        });
        assert_eq!(first.unwrap(), LoadStatus::Stale);
        assert_eq!(second.unwrap(), LoadStatus::Applied);
        assert_eq!(player.course().unwrap().field(), "HVAC");
    }

    struct OfflineProgress;

    #[async_trait]
    impl ProgressRepository for OfflineProgress {
        async fn find_progress(
            &self,
            _user_id: UserId,
            _course_id: CourseId,
        ) -> Result<Option<UserProgress>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn insert_progress(
            &self,
            _record: NewProgressRecord,
        ) -> Result<UserProgress, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn update_progress(
            &self,
            _id: ProgressId,
            _patch: ProgressPatch,
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn list_progress(&self, _user_id: UserId) -> Result<Vec<UserProgress>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    #[tokio::test]
    async fn progress_failure_keeps_player_state() {
        let ItBasics { storage, course, lessons, .. } = it_basics().await;
        let user = UserId::random();
        let player = CoursePlayer::new(
            Clock::fixed(fixed_now()),
            CourseTreeLoader::from_storage(&storage),
            ProgressPersister::new(
                Clock::fixed(fixed_now()),
                Arc::new(OfflineProgress),
                Arc::clone(&storage.activities),
            ),
            Arc::clone(&storage.completions),
            Arc::clone(&storage.vocabulary),
            Arc::clone(&storage.profiles),
        )
        .with_user(Some(user));

        assert_eq!(player.open_course(course.id()).await.unwrap(), LoadStatus::Applied);
        assert_eq!(
            player.mark_current_complete().await.unwrap(),
            CompletionOutcome::Recorded { course_completed: false }
        );
        assert!(player.current_completed());
        assert_eq!(player.stats().completed_lessons, 1);
        assert!(storage.completions.has_completion(user, lessons[0]).await.unwrap());
    }

    /// Reads completions from memory but refuses to write new ones.
    struct ReadOnlyCompletions(InMemoryRepository);

    #[async_trait]
    impl CompletionRepository for ReadOnlyCompletions {
        async fn has_completion(
            &self,
            user_id: UserId,
            lesson_id: LessonId,
        ) -> Result<bool, StorageError> {
            self.0.has_completion(user_id, lesson_id).await
        }

        async fn record_completion(
            &self,
            _completion: &LessonCompletion,
        ) -> Result<CompletionInsert, StorageError> {
            Err(StorageError::Connection("read-only".into()))
        }
    }

    #[tokio::test]
    async fn failed_completion_write_leaves_lesson_incomplete() {
        let ItBasics { storage, repo, course, lessons, .. } = it_basics().await;
        let completions: Arc<dyn CompletionRepository> =
            Arc::new(ReadOnlyCompletions(repo.clone()));
        let player = CoursePlayer::new(
            Clock::fixed(fixed_now()),
            CourseTreeLoader::new(
                Arc::clone(&storage.courses),
                Arc::clone(&storage.modules),
                Arc::clone(&storage.lessons),
                Arc::clone(&completions),
            ),
            ProgressPersister::from_storage(Clock::fixed(fixed_now()), &storage),
            completions,
            Arc::clone(&storage.vocabulary),
            Arc::clone(&storage.profiles),
        )
        .with_user(Some(UserId::random()));
        player.open_course(course.id()).await.unwrap();

        assert!(matches!(
            player.next().await,
            Err(PlayerError::Storage(StorageError::Connection(_)))
        ));
        assert_eq!(player.current_lesson().unwrap().id(), lessons[0]);
        assert!(!player.current_completed());
        assert_eq!(player.stats().completed_lessons, 0);
    }
}
