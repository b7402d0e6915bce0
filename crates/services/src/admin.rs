use std::sync::Arc;

use tracing::info;

use course_core::Clock;
use course_core::model::{
    Course, CourseDraft, CourseId, Lesson, LessonDraft, LessonId, Module, ModuleDraft, ModuleId,
    UserId, Vocabulary, VocabularyDraft, VocabularyId,
};
use storage::repository::{
    CourseRepository, LessonRepository, ModuleRepository, ProfileRepository, Storage,
    VocabularyRepository,
};

use crate::error::AdminError;

/// One edit form submission. `id == None` inside a draft creates a new row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminDraft {
    Course(CourseDraft),
    Module(ModuleDraft),
    Lesson(LessonDraft),
    Vocabulary(VocabularyDraft),
}

/// The row written by `AdminService::save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRecord {
    Course(Course),
    Module(Module),
    Lesson(Lesson),
    Vocabulary(Vocabulary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminTarget {
    Course(CourseId),
    Module(ModuleId),
    Lesson(LessonId),
    Vocabulary(VocabularyId),
}

/// Content management for admins. Every call checks the acting user's
/// profile first.
#[derive(Clone)]
pub struct AdminService {
    clock: Clock,
    acting_user: UserId,
    profiles: Arc<dyn ProfileRepository>,
    courses: Arc<dyn CourseRepository>,
    modules: Arc<dyn ModuleRepository>,
    lessons: Arc<dyn LessonRepository>,
    vocabulary: Arc<dyn VocabularyRepository>,
}

impl AdminService {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage, acting_user: UserId) -> Self {
        Self {
            clock,
            acting_user,
            profiles: Arc::clone(&storage.profiles),
            courses: Arc::clone(&storage.courses),
            modules: Arc::clone(&storage.modules),
            lessons: Arc::clone(&storage.lessons),
            vocabulary: Arc::clone(&storage.vocabulary),
        }
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotAdmin` unless the acting user's profile carries
    /// the admin flag.
    pub async fn ensure_admin(&self) -> Result<(), AdminError> {
        let profile = self.profiles.get_profile(self.acting_user).await?;
        if profile.is_some_and(|p| p.is_admin) {
            Ok(())
        } else {
            Err(AdminError::NotAdmin)
        }
    }

    /// Validate and write a draft.
    ///
    /// Editing a course keeps its original creation time.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Invalid` for drafts the model rejects, or
    /// `AdminError::Storage` (`NotFound` for a missing parent).
    pub async fn save(&self, draft: AdminDraft) -> Result<AdminRecord, AdminError> {
        self.ensure_admin().await?;

        let record = match draft {
            AdminDraft::Course(draft) => {
                let created_at = match draft.id {
                    Some(id) => self.courses.get_course(id).await?.map(|c| c.created_at()),
                    None => None,
                }
                .unwrap_or_else(|| self.clock.now());
                let course = draft.validate(created_at).map_err(course_core::Error::from)?;
                self.courses.upsert_course(&course).await?;
                AdminRecord::Course(course)
            }
            AdminDraft::Module(draft) => {
                let module = draft.validate().map_err(course_core::Error::from)?;
                self.modules.upsert_module(&module).await?;
                AdminRecord::Module(module)
            }
            AdminDraft::Lesson(draft) => {
                let lesson = draft.validate().map_err(course_core::Error::from)?;
                self.lessons.upsert_lesson(&lesson).await?;
                AdminRecord::Lesson(lesson)
            }
            AdminDraft::Vocabulary(draft) => {
                let entry = draft.validate().map_err(course_core::Error::from)?;
                self.vocabulary.upsert_vocabulary(&entry).await?;
                AdminRecord::Vocabulary(entry)
            }
        };

        info!(user_id = %self.acting_user, ?record, "admin saved content");
        Ok(record)
    }

    /// Delete a row together with everything below it.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Storage(StorageError::NotFound)` for unknown ids.
    pub async fn delete(&self, target: AdminTarget) -> Result<(), AdminError> {
        self.ensure_admin().await?;
        match target {
            AdminTarget::Course(id) => self.courses.delete_course(id).await?,
            AdminTarget::Module(id) => self.modules.delete_module(id).await?,
            AdminTarget::Lesson(id) => self.lessons.delete_lesson(id).await?,
            AdminTarget::Vocabulary(id) => self.vocabulary.delete_vocabulary(id).await?,
        }
        info!(user_id = %self.acting_user, ?target, "admin deleted content");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AdminError` if the caller is not an admin or storage fails.
    pub async fn list_courses(&self) -> Result<Vec<Course>, AdminError> {
        self.ensure_admin().await?;
        Ok(self.courses.list_courses().await?)
    }

    /// # Errors
    ///
    /// Returns `AdminError` if the caller is not an admin or storage fails.
    pub async fn list_modules(&self, course_id: CourseId) -> Result<Vec<Module>, AdminError> {
        self.ensure_admin().await?;
        Ok(self.modules.list_modules(course_id).await?)
    }

    /// # Errors
    ///
    /// Returns `AdminError` if the caller is not an admin or storage fails.
    pub async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, AdminError> {
        self.ensure_admin().await?;
        Ok(self.lessons.list_lessons(module_id).await?)
    }

    /// # Errors
    ///
    /// Returns `AdminError` if the caller is not an admin or storage fails.
    pub async fn list_vocabulary(&self, lesson_id: LessonId) -> Result<Vec<Vocabulary>, AdminError> {
        self.ensure_admin().await?;
        Ok(self.vocabulary.list_vocabulary(lesson_id).await?)
    }

    /// `order_index` for a module appended to `course_id`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the caller is not an admin or storage fails.
    pub async fn next_module_order(&self, course_id: CourseId) -> Result<i32, AdminError> {
        let modules = self.list_modules(course_id).await?;
        Ok(next_order(modules.iter().map(Module::order_index)))
    }

    /// `order_index` for a lesson appended to `module_id`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError` if the caller is not an admin or storage fails.
    pub async fn next_lesson_order(&self, module_id: ModuleId) -> Result<i32, AdminError> {
        let lessons = self.list_lessons(module_id).await?;
        Ok(next_order(lessons.iter().map(Lesson::order_index)))
    }
}

fn next_order(indices: impl Iterator<Item = i32>) -> i32 {
    indices.max().map_or(0, |max| max.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CourseError, LessonType, Profile};
    use course_core::time::fixed_now;
    use storage::repository::StorageError;

    async fn admin_storage() -> (Storage, UserId) {
        let storage = Storage::in_memory();
        let admin = UserId::random();
        let mut profile = Profile::blank(admin, fixed_now());
        profile.is_admin = true;
        storage.profiles.upsert_profile(&profile).await.unwrap();
        (storage, admin)
    }

    fn course_draft(id: Option<CourseId>, title: &str) -> AdminDraft {
        AdminDraft::Course(CourseDraft {
            id,
            title: title.into(),
            description: None,
            field: "Electrical".into(),
            icon: Some("bolt".into()),
        })
    }

    #[tokio::test]
    async fn non_admin_is_rejected() {
        let storage = Storage::in_memory();
        let learner = UserId::random();
        storage
            .profiles
            .upsert_profile(&Profile::blank(learner, fixed_now()))
            .await
            .unwrap();

        let service = AdminService::new(Clock::fixed(fixed_now()), &storage, learner);
        assert!(matches!(
            service.save(course_draft(None, "Wiring")).await,
            Err(AdminError::NotAdmin)
        ));
        let stranger = AdminService::new(Clock::fixed(fixed_now()), &storage, UserId::random());
        assert!(matches!(stranger.list_courses().await, Err(AdminError::NotAdmin)));
    }

    #[tokio::test]
    async fn builds_course_content_in_order() {
        let (storage, admin) = admin_storage().await;
        let service = AdminService::new(Clock::fixed(fixed_now()), &storage, admin);

        let AdminRecord::Course(course) = service.save(course_draft(None, "Wiring")).await.unwrap()
        else {
            panic!("expected course");
        };
        assert_eq!(service.next_module_order(course.id()).await.unwrap(), 0);

        let AdminRecord::Module(module) = service
            .save(AdminDraft::Module(ModuleDraft {
                id: None,
                course_id: course.id(),
                title: "Safety".into(),
                description: None,
                order_index: 0,
            }))
            .await
            .unwrap()
        else {
            panic!("expected module");
        };
        assert_eq!(service.next_module_order(course.id()).await.unwrap(), 1);

        let lesson = service
            .save(AdminDraft::Lesson(LessonDraft {
                id: None,
                module_id: module.id(),
                title: "Lockout".into(),
                content: "Always lock out the panel.".into(),
                lesson_type: LessonType::Video,
                video_url: Some("https://videos.example.com/lockout".into()),
                order_index: 4,
                duration_minutes: 12,
            }))
            .await
            .unwrap();
        assert!(matches!(lesson, AdminRecord::Lesson(_)));
        assert_eq!(service.next_lesson_order(module.id()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn editing_course_keeps_created_at() {
        let (storage, admin) = admin_storage().await;
        let mut clock = Clock::fixed(fixed_now());
        let AdminRecord::Course(course) = AdminService::new(clock, &storage, admin)
            .save(course_draft(None, "Wiring"))
            .await
            .unwrap()
        else {
            panic!("expected course");
        };

        clock.advance(chrono::Duration::days(3));
        AdminService::new(clock, &storage, admin)
            .save(course_draft(Some(course.id()), "Wiring basics"))
            .await
            .unwrap();

        let stored = storage.courses.get_course(course.id()).await.unwrap().unwrap();
        assert_eq!(stored.title(), "Wiring basics");
        assert_eq!(stored.created_at(), fixed_now());
    }

    #[tokio::test]
    async fn invalid_drafts_and_orphans_fail() {
        let (storage, admin) = admin_storage().await;
        let service = AdminService::new(Clock::fixed(fixed_now()), &storage, admin);

        assert!(matches!(
            service.save(course_draft(None, "   ")).await,
            Err(AdminError::Invalid(course_core::Error::Course(CourseError::EmptyTitle)))
        ));
        assert!(matches!(
            service
                .save(AdminDraft::Module(ModuleDraft {
                    id: None,
                    course_id: CourseId::random(),
                    title: "Loose".into(),
                    description: None,
                    order_index: 0,
                }))
                .await,
            Err(AdminError::Storage(StorageError::NotFound))
        ));
        assert!(matches!(
            service.delete(AdminTarget::Lesson(LessonId::random())).await,
            Err(AdminError::Storage(StorageError::NotFound))
        ));
    }

    #[tokio::test]
    async fn deleting_course_removes_children() {
        let (storage, admin) = admin_storage().await;
        let service = AdminService::new(Clock::fixed(fixed_now()), &storage, admin);
        let AdminRecord::Course(course) = service.save(course_draft(None, "Wiring")).await.unwrap()
        else {
            panic!("expected course");
        };
        service
            .save(AdminDraft::Module(ModuleDraft {
                id: None,
                course_id: course.id(),
                title: "Safety".into(),
                description: None,
                order_index: 0,
            }))
            .await
            .unwrap();

        service.delete(AdminTarget::Course(course.id())).await.unwrap();
        assert!(service.list_courses().await.unwrap().is_empty());
        assert!(service.list_modules(course.id()).await.unwrap().is_empty());
    }
}
