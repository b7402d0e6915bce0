use std::sync::Arc;

use futures::future::try_join_all;

use course_core::model::{Achievement, Activity, Course, UserId};
use storage::repository::{
    AchievementRepository, ActivityRepository, CourseRepository, ProgressRepository, Storage,
};

use crate::error::DashboardError;

/// Number of activities shown in the recent list.
pub const RECENT_ACTIVITY_LIMIT: u32 = 5;

/// Number of achievements shown on the dashboard.
pub const RECENT_ACHIEVEMENT_LIMIT: u32 = 5;

/// Progress of one started course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgressLine {
    pub course: Course,
    pub progress_percentage: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_points: u64,
    pub courses_completed: u32,
    pub hours_studied: u64,
    /// Mean progress over started courses, rounded half up; 0 with none.
    pub overall_progress: u8,
    /// Longest running study streak across courses, in days.
    pub current_streak: u32,
    pub courses: Vec<CourseProgressLine>,
    /// The most recently accessed course that is not finished yet.
    pub last_active: Option<Course>,
    pub recent_activities: Vec<Activity>,
    pub recent_achievements: Vec<Achievement>,
}

/// Aggregates a learner's progress records and activity log.
#[derive(Clone)]
pub struct DashboardService {
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn ProgressRepository>,
    activities: Arc<dyn ActivityRepository>,
    achievements: Arc<dyn AchievementRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn ProgressRepository>,
        activities: Arc<dyn ActivityRepository>,
        achievements: Arc<dyn AchievementRepository>,
    ) -> Self {
        Self {
            courses,
            progress,
            activities,
            achievements,
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.activities),
            Arc::clone(&storage.achievements),
        )
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if any fetch fails.
    pub async fn stats(&self, user_id: UserId) -> Result<DashboardStats, DashboardError> {
        let (records, activities, recent_achievements) = tokio::try_join!(
            self.progress.list_progress(user_id),
            self.activities.list_activities(user_id, None),
            self.achievements
                .list_achievements(user_id, Some(RECENT_ACHIEVEMENT_LIMIT)),
        )?;

        let courses = try_join_all(records.iter().map(|p| self.courses.get_course(p.course_id))).await?;

        let started = u64::try_from(records.len()).unwrap_or(u64::MAX);
        let percent_sum: u64 = records
            .iter()
            .map(|p| u64::from(p.progress_percentage))
            .sum();
        let overall_progress = if started == 0 {
            0
        } else {
            u8::try_from((2 * percent_sum + started) / (2 * started)).unwrap_or(100)
        };

        // Records are most recently accessed first.
        let lines: Vec<_> = records
            .iter()
            .zip(courses)
            .filter_map(|(p, course)| {
                course.map(|course| CourseProgressLine {
                    course,
                    progress_percentage: p.progress_percentage,
                })
            })
            .collect();
        let last_active = lines
            .iter()
            .find(|line| line.progress_percentage < 100)
            .map(|line| line.course.clone());

        Ok(DashboardStats {
            total_points: activities.iter().map(|a| u64::from(a.points)).sum(),
            courses_completed: u32::try_from(records.iter().filter(|p| p.is_complete()).count())
                .unwrap_or(u32::MAX),
            hours_studied: records.iter().map(|p| u64::from(p.hours_studied)).sum(),
            overall_progress,
            current_streak: records.iter().map(|p| p.current_streak).max().unwrap_or(0),
            courses: lines,
            last_active,
            recent_activities: activities
                .into_iter()
                .take(RECENT_ACTIVITY_LIMIT as usize)
                .collect(),
            recent_achievements,
        })
    }
}
