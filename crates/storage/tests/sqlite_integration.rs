use chrono::Duration;
use course_core::model::{
    ActivityKind, Course, CourseId, InterfaceLanguage, Lesson, LessonCompletion, LessonId,
    LessonType, Module, ModuleId, NewAchievement, NewActivity, NewProgressRecord, Profile,
    ProgressPatch, UserId, UserSettings, Vocabulary, VocabularyId,
};
use course_core::time::fixed_now;
use storage::repository::{
    AVATAR_BUCKET, AchievementRepository, ActivityRepository, BlobStore, CompletionInsert,
    CompletionRepository, CourseRepository, LessonRepository, ModuleRepository,
    ProfileRepository, ProgressRepository, SettingsRepository, StorageError,
    VocabularyRepository,
};
use storage::sqlite::SqliteRepository;
use uuid::Uuid;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_course(repo: &SqliteRepository) -> (Course, Module, Lesson) {
    let course = Course::new(
        CourseId::random(),
        "IT Basics",
        Some("Workplace English for IT".into()),
        "IT",
        fixed_now(),
    )
    .unwrap()
    .with_icon(Some("laptop".into()));
    repo.upsert_course(&course).await.unwrap();

    let module = Module::new(ModuleId::random(), course.id(), "Hardware", None, 0).unwrap();
    repo.upsert_module(&module).await.unwrap();

    let lesson = Lesson::new(
        LessonId::random(),
        module.id(),
        "Parts of a computer",
        "The CPU is...",
        LessonType::Video,
        None,
        0,
        30,
    )
    .unwrap();
    repo.upsert_lesson(&lesson).await.unwrap();

    (course, module, lesson)
}

#[tokio::test]
async fn content_round_trips_in_order() {
    let repo = connect("memdb_content").await;
    let (course, module, first) = seed_course(&repo).await;

    assert_eq!(repo.get_course(course.id()).await.unwrap(), Some(course.clone()));
    assert_eq!(
        repo.find_course_by_field("IT").await.unwrap().map(|c| c.id()),
        Some(course.id())
    );
    assert!(repo.find_course_by_field("HVAC").await.unwrap().is_none());

    let tie_low = Lesson::new(
        LessonId::new(Uuid::from_u128(1)),
        module.id(),
        "Networks",
        "",
        LessonType::Reading,
        None,
        1,
        45,
    )
    .unwrap();
    let tie_high = Lesson::new(
        LessonId::new(Uuid::from_u128(2)),
        module.id(),
        "Printers",
        "",
        LessonType::Quiz,
        None,
        1,
        15,
    )
    .unwrap();
    repo.upsert_lesson(&tie_high).await.unwrap();
    repo.upsert_lesson(&tie_low).await.unwrap();

    let lessons = repo.list_lessons(module.id()).await.unwrap();
    let ids: Vec<_> = lessons.iter().map(Lesson::id).collect();
    assert_eq!(ids, vec![first.id(), tie_low.id(), tie_high.id()]);
    assert_eq!(lessons[0], first);
}

#[tokio::test]
async fn orphans_are_rejected_and_deletes_cascade() {
    let repo = connect("memdb_cascade").await;
    let (course, module, lesson) = seed_course(&repo).await;

    let orphan = Module::new(ModuleId::random(), CourseId::random(), "Loose", None, 0).unwrap();
    assert!(matches!(
        repo.upsert_module(&orphan).await,
        Err(StorageError::NotFound)
    ));

    let word = Vocabulary::new(
        VocabularyId::random(),
        lesson.id(),
        "motherboard",
        "main circuit board",
        None,
        None,
    )
    .unwrap();
    repo.upsert_vocabulary(&word).await.unwrap();

    repo.delete_course(course.id()).await.unwrap();
    assert!(repo.list_modules(course.id()).await.unwrap().is_empty());
    assert!(repo.list_lessons(module.id()).await.unwrap().is_empty());
    assert!(repo.list_vocabulary(lesson.id()).await.unwrap().is_empty());
    assert!(matches!(
        repo.delete_course(course.id()).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn vocabulary_lists_by_term() {
    let repo = connect("memdb_vocabulary").await;
    let (_, _, lesson) = seed_course(&repo).await;

    for term in ["router", "CPU", "bandwidth"] {
        let entry = Vocabulary::new(
            VocabularyId::random(),
            lesson.id(),
            term,
            "definition",
            Some("An example.".into()),
            None,
        )
        .unwrap();
        repo.upsert_vocabulary(&entry).await.unwrap();
    }

    let terms: Vec<_> = repo
        .list_vocabulary(lesson.id())
        .await
        .unwrap()
        .iter()
        .map(|v| v.term().to_owned())
        .collect();
    assert_eq!(terms, vec!["bandwidth", "CPU", "router"]);
}

#[tokio::test]
async fn duplicate_completion_is_ignored() {
    let repo = connect("memdb_completion").await;
    let (_, _, lesson) = seed_course(&repo).await;
    let user = UserId::random();

    let completion = LessonCompletion::new(user, lesson.id(), fixed_now());
    assert_eq!(
        repo.record_completion(&completion).await.unwrap(),
        CompletionInsert::Inserted
    );
    assert_eq!(
        repo.record_completion(&completion).await.unwrap(),
        CompletionInsert::AlreadyRecorded
    );
    assert!(repo.has_completion(user, lesson.id()).await.unwrap());
    assert!(!repo.has_completion(UserId::random(), lesson.id()).await.unwrap());
}

#[tokio::test]
async fn progress_is_unique_per_user_and_course() {
    let repo = connect("memdb_progress").await;
    let (course, _, _) = seed_course(&repo).await;
    let user = UserId::random();

    let record = NewProgressRecord {
        user_id: user,
        course_id: course.id(),
        values: ProgressPatch {
            progress_percentage: 33,
            lessons_completed: 1,
            hours_studied: 0,
            current_streak: 1,
            last_accessed: fixed_now(),
        },
    };
    let created = repo.insert_progress(record).await.unwrap();
    assert!(matches!(
        repo.insert_progress(record).await,
        Err(StorageError::Conflict)
    ));

    let patch = ProgressPatch {
        progress_percentage: 100,
        lessons_completed: 3,
        hours_studied: 2,
        current_streak: 2,
        last_accessed: fixed_now() + Duration::minutes(5),
    };
    repo.update_progress(created.id, patch).await.unwrap();

    let stored = repo.find_progress(user, course.id()).await.unwrap().unwrap();
    assert_eq!(stored.id, created.id);
    assert_eq!(stored.progress_percentage, 100);
    assert_eq!(stored.lessons_completed, 3);
    assert_eq!(stored.hours_studied, 2);
    assert_eq!(stored.current_streak, 2);
    assert_eq!(stored.last_accessed, patch.last_accessed);
    assert_eq!(repo.list_progress(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn activities_list_newest_first_with_limit() {
    let repo = connect("memdb_activities").await;
    let user = UserId::random();

    for (offset, title) in [(0, "first"), (10, "second"), (10, "third")] {
        repo.append_activity(NewActivity {
            user_id: user,
            kind: ActivityKind::Completed,
            title: title.into(),
            points: 100,
            created_at: fixed_now() + Duration::minutes(offset),
        })
        .await
        .unwrap();
    }

    let titles: Vec<_> = repo
        .list_activities(user, Some(2))
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.title)
        .collect();
    assert_eq!(titles, vec!["third", "second"]);
    assert_eq!(repo.list_activities(user, None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn profile_upsert_overwrites() {
    let repo = connect("memdb_profiles").await;
    let mut profile = Profile::blank(UserId::random(), fixed_now());
    repo.upsert_profile(&profile).await.unwrap();

    profile.professional_field = Some("Electrical".into());
    profile.is_admin = true;
    repo.upsert_profile(&profile).await.unwrap();

    assert_eq!(repo.get_profile(profile.id).await.unwrap(), Some(profile));
}

#[tokio::test]
async fn achievements_list_newest_first_with_limit() {
    let repo = connect("memdb_achievements").await;
    let user = UserId::random();

    for (offset, title) in [(0, "First lesson"), (60, "First course"), (30, "Three days")] {
        let earned = fixed_now() + Duration::minutes(offset);
        repo.award_achievement(
            NewAchievement::new(user, title, 50, earned)
                .unwrap()
                .with_icon(Some("trophy".into())),
        )
        .await
        .unwrap();
    }

    let newest = repo.list_achievements(user, Some(2)).await.unwrap();
    let titles: Vec<_> = newest.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["First course", "Three days"]);
    assert_eq!(newest[0].icon.as_deref(), Some("trophy"));
    assert_eq!(newest[0].description, None);
    assert!(repo.list_achievements(UserId::random(), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn settings_upsert_by_user() {
    let repo = connect("memdb_settings").await;
    let user = UserId::random();
    assert!(repo.get_settings(user).await.unwrap().is_none());

    let mut settings = UserSettings::defaults(user, fixed_now());
    repo.upsert_settings(&settings).await.unwrap();
    settings.interface_language = InterfaceLanguage::Turkish;
    settings.progress_reminders = false;
    settings.updated_at = fixed_now() + Duration::minutes(1);
    repo.upsert_settings(&settings).await.unwrap();

    assert_eq!(repo.get_settings(user).await.unwrap(), Some(settings));
}

#[tokio::test]
async fn blobs_overwrite_and_remove() {
    let repo = connect("memdb_blobs").await;
    repo.put_object(AVATAR_BUCKET, "u1/avatar.png", b"first").await.unwrap();
    repo.put_object(AVATAR_BUCKET, "u1/avatar.png", b"second").await.unwrap();
    assert_eq!(
        repo.get_object(AVATAR_BUCKET, "u1/avatar.png").await.unwrap(),
        Some(b"second".to_vec())
    );

    repo.remove_object(AVATAR_BUCKET, "u1/avatar.png").await.unwrap();
    assert_eq!(repo.get_object(AVATAR_BUCKET, "u1/avatar.png").await.unwrap(), None);
    repo.remove_object(AVATAR_BUCKET, "u1/avatar.png").await.unwrap();
}

#[tokio::test]
async fn migrations_run_twice() {
    let repo = connect("memdb_remigrate").await;
    repo.migrate().await.unwrap();
}
