//! In-memory fixtures shared by the service tests.

use course_core::model::{
    Course, CourseId, Lesson, LessonId, LessonType, Module, ModuleId, Vocabulary, VocabularyId,
};
use course_core::time::fixed_now;
use storage::repository::{InMemoryRepository, Storage};

pub(crate) struct ItBasics {
    pub storage: Storage,
    pub repo: InMemoryRepository,
    pub course: Course,
    pub modules: [ModuleId; 2],
    pub lessons: [LessonId; 3],
}

/// "IT Basics": M1 [L1 30 min, L2 45 min], M2 [L3 90 min].
///
/// Rows are inserted out of order so tests exercise the loader's sorting.
pub(crate) async fn it_basics() -> ItBasics {
    let repo = InMemoryRepository::new();
    let storage = Storage::from_repository(repo.clone());

    let course = Course::new(
        CourseId::random(),
        "IT Basics",
        Some("English for IT support".into()),
        "IT",
        fixed_now(),
    )
    .unwrap();
    storage.courses.upsert_course(&course).await.unwrap();

    let m1 = Module::new(ModuleId::random(), course.id(), "Hardware", None, 0).unwrap();
    let m2 = Module::new(ModuleId::random(), course.id(), "Networking", None, 1).unwrap();
    storage.modules.upsert_module(&m2).await.unwrap();
    storage.modules.upsert_module(&m1).await.unwrap();

    let l1 = lesson(&m1, "Parts of a computer", 0, 30);
    let l2 = lesson(&m1, "Describing a fault", 1, 45);
    let l3 = lesson(&m2, "Talking about networks", 0, 90);
    for l in [&l3, &l2, &l1] {
        storage.lessons.upsert_lesson(l).await.unwrap();
    }

    for (term, lesson_id) in [("RAM", l1.id()), ("cable", l1.id()), ("router", l3.id())] {
        let entry = Vocabulary::new(
            VocabularyId::random(),
            lesson_id,
            term,
            format!("definition of {term}"),
            None,
            None,
        )
        .unwrap();
        storage.vocabulary.upsert_vocabulary(&entry).await.unwrap();
    }

    ItBasics {
        storage,
        repo,
        course,
        modules: [m1.id(), m2.id()],
        lessons: [l1.id(), l2.id(), l3.id()],
    }
}

pub(crate) fn lesson(module: &Module, title: &str, order: i32, minutes: u32) -> Lesson {
    Lesson::new(
        LessonId::random(),
        module.id(),
        title,
        format!("{title} content"),
        LessonType::Reading,
        None,
        order,
        minutes,
    )
    .unwrap()
}
