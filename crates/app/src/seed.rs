use chrono::{DateTime, Utc};
use uuid::Uuid;

use course_core::model::{
    Course, CourseId, Lesson, LessonId, LessonType, Module, ModuleId, Vocabulary, VocabularyId,
};
use storage::repository::{
    CourseRepository, LessonRepository, ModuleRepository, Storage, VocabularyRepository,
};

/// Counts of rows written by `seed_catalog`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub courses: usize,
    pub modules: usize,
    pub lessons: usize,
    pub vocabulary: usize,
}

struct LessonSeed {
    title: &'static str,
    content: &'static str,
    lesson_type: LessonType,
    minutes: u32,
    vocabulary: &'static [(&'static str, &'static str, Option<&'static str>)],
}

struct ModuleSeed {
    title: &'static str,
    description: &'static str,
    lessons: &'static [LessonSeed],
}

struct CourseSeed {
    title: &'static str,
    description: &'static str,
    field: &'static str,
    icon: &'static str,
    modules: &'static [ModuleSeed],
}

const CATALOG: &[CourseSeed] = &[
    CourseSeed {
        title: "IT Basics",
        description: "Talk through hardware, faults and networks with colleagues and customers.",
        field: "IT",
        icon: "monitor",
        modules: &[
            ModuleSeed {
                title: "At the help desk",
                description: "Describing hardware and the problems it has.",
                lessons: &[
                    LessonSeed {
                        title: "Parts of a computer",
                        content: "Name the parts inside the case and say what each one does.",
                        lesson_type: LessonType::Reading,
                        minutes: 30,
                        vocabulary: &[
                            ("RAM", "Short-term memory used by running programs.", Some("The laptop needs more RAM.")),
                            ("cable", "A wire that carries power or data.", None),
                        ],
                    },
                    LessonSeed {
                        title: "Reporting a fault",
                        content: "Ask what happened, when it started and what changed.",
                        lesson_type: LessonType::Exercise,
                        minutes: 45,
                        vocabulary: &[
                            ("reboot", "To switch a device off and on again.", Some("Please reboot the printer.")),
                        ],
                    },
                ],
            },
            ModuleSeed {
                title: "Networks",
                description: "Explaining how devices connect.",
                lessons: &[LessonSeed {
                    title: "Routers and switches",
                    content: "Compare the jobs of a router and a switch.",
                    lesson_type: LessonType::Reading,
                    minutes: 90,
                    vocabulary: &[
                        ("router", "A device that forwards traffic between networks.", None),
                    ],
                }],
            },
        ],
    },
    CourseSeed {
        title: "Electrical Safety English",
        description: "Safety briefings and site talk for electricians.",
        field: "Electrical",
        icon: "bolt",
        modules: &[ModuleSeed {
            title: "On site",
            description: "Staying safe around live equipment.",
            lessons: &[
                LessonSeed {
                    title: "Lockout procedure",
                    content: "Walk a colleague through isolating a circuit.",
                    lesson_type: LessonType::Video,
                    minutes: 20,
                    vocabulary: &[
                        ("breaker", "A switch that cuts power when a circuit overloads.", None),
                        ("isolate", "To disconnect equipment from its power source.", None),
                    ],
                },
                LessonSeed {
                    title: "Safety check quiz",
                    content: "Answer questions about the lockout steps.",
                    lesson_type: LessonType::Quiz,
                    minutes: 15,
                    vocabulary: &[],
                },
            ],
        }],
    },
    CourseSeed {
        title: "HVAC Service Calls",
        description: "Explaining heating and cooling repairs to customers.",
        field: "HVAC",
        icon: "fan",
        modules: &[ModuleSeed {
            title: "Visiting a customer",
            description: "From the front door to the invoice.",
            lessons: &[LessonSeed {
                title: "Describing airflow problems",
                content: "Use comparatives to explain weak or uneven airflow.",
                lesson_type: LessonType::Reading,
                minutes: 40,
                vocabulary: &[
                    ("duct", "A channel that carries air through a building.", Some("The duct is blocked.")),
                    ("thermostat", "A device that controls temperature.", None),
                ],
            }],
        }],
    },
];

/// Stable ids so seeding the same database twice updates rows in place.
fn seed_uuid(course: usize, module: usize, lesson: usize, entry: usize, kind: u8) -> Uuid {
    let packed = (u128::from(kind) << 120)
        | ((course as u128) << 96)
        | ((module as u128) << 64)
        | ((lesson as u128) << 32)
        | entry as u128;
    Uuid::from_u128(packed)
}

/// Write the demo catalog.
///
/// # Errors
///
/// Returns an error if a row fails validation or storage rejects it.
pub async fn seed_catalog(storage: &Storage, now: DateTime<Utc>) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    for (c, course_seed) in CATALOG.iter().enumerate() {
        let course_id = CourseId::new(seed_uuid(c, 0, 0, 0, 1));
        let created_at = storage
            .courses
            .get_course(course_id)
            .await?
            .map_or(now, |existing| existing.created_at());
        let course = Course::new(
            course_id,
            course_seed.title,
            Some(course_seed.description.to_owned()),
            course_seed.field,
            created_at,
        )?
        .with_icon(Some(course_seed.icon.to_owned()));
        storage.courses.upsert_course(&course).await?;
        report.courses += 1;

        for (m, module_seed) in (0..).zip(course_seed.modules) {
            let module = Module::new(
                ModuleId::new(seed_uuid(c, m + 1, 0, 0, 2)),
                course_id,
                module_seed.title,
                Some(module_seed.description.to_owned()),
                i32::try_from(m)?,
            )?;
            storage.modules.upsert_module(&module).await?;
            report.modules += 1;

            for (l, lesson_seed) in (0..).zip(module_seed.lessons) {
                let lesson = Lesson::new(
                    LessonId::new(seed_uuid(c, m + 1, l + 1, 0, 3)),
                    module.id(),
                    lesson_seed.title,
                    lesson_seed.content,
                    lesson_seed.lesson_type,
                    None,
                    i32::try_from(l)?,
                    lesson_seed.minutes,
                )?;
                storage.lessons.upsert_lesson(&lesson).await?;
                report.lessons += 1;

                for (v, (term, definition, example)) in lesson_seed.vocabulary.iter().enumerate() {
                    let entry = Vocabulary::new(
                        VocabularyId::new(seed_uuid(c, m + 1, l + 1, v + 1, 4)),
                        lesson.id(),
                        *term,
                        *definition,
                        example.map(str::to_owned),
                        None,
                    )?;
                    storage.vocabulary.upsert_vocabulary(&entry).await?;
                    report.vocabulary += 1;
                }
            }
        }
    }

    Ok(report)
}
