use chrono::{DateTime, Utc};

use crate::model::course::Course;
use crate::model::ids::{ActivityId, UserId};

/// Points granted when a learner finishes a course.
pub const COURSE_COMPLETION_POINTS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Completed,
    /// Any type written by other clients of the data service.
    Other(String),
}

impl ActivityKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ActivityKind::Completed => "completed",
            ActivityKind::Other(s) => s.as_str(),
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "completed" => ActivityKind::Completed,
            other => ActivityKind::Other(other.to_owned()),
        }
    }
}

/// Append-only milestone entry shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: ActivityId,
    pub user_id: UserId,
    pub kind: ActivityKind,
    pub title: String,
    pub points: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub user_id: UserId,
    pub kind: ActivityKind,
    pub title: String,
    pub points: u32,
    pub created_at: DateTime<Utc>,
}

impl NewActivity {
    #[must_use]
    pub fn course_completed(user_id: UserId, course: &Course, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            kind: ActivityKind::Completed,
            title: format!("Completed {} course", course.field()),
            points: COURSE_COMPLETION_POINTS,
            created_at: at,
        }
    }

    #[must_use]
    pub fn assign_id(self, id: ActivityId) -> Activity {
        Activity {
            id,
            user_id: self.user_id,
            kind: self.kind,
            title: self.title,
            points: self.points,
            created_at: self.created_at,
        }
    }
}
