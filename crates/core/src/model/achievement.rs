use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::course::normalize_optional;
use crate::model::ids::{AchievementId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AchievementError {
    #[error("achievement title cannot be empty")]
    EmptyTitle,
}

/// A badge earned by a learner, listed newest first on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub id: AchievementId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub points_earned: u32,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAchievement {
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub points_earned: u32,
    pub earned_at: DateTime<Utc>,
}

impl NewAchievement {
    /// # Errors
    ///
    /// Returns `AchievementError::EmptyTitle` if the title is blank.
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        points_earned: u32,
        earned_at: DateTime<Utc>,
    ) -> Result<Self, AchievementError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(AchievementError::EmptyTitle);
        }
        Ok(Self {
            user_id,
            title,
            description: None,
            icon: None,
            points_earned,
            earned_at,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = normalize_optional(description);
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = normalize_optional(icon);
        self
    }

    #[must_use]
    pub fn assign_id(self, id: AchievementId) -> Achievement {
        Achievement {
            id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            icon: self.icon,
            points_earned: self.points_earned,
            earned_at: self.earned_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn blank_title_is_rejected() {
        assert_eq!(
            NewAchievement::new(UserId::random(), "  ", 10, fixed_now()),
            Err(AchievementError::EmptyTitle)
        );
    }

    #[test]
    fn optional_text_is_normalized() {
        let achievement = NewAchievement::new(UserId::random(), " First Steps ", 10, fixed_now())
            .unwrap()
            .with_description(Some("   ".into()))
            .with_icon(Some("star".into()))
            .assign_id(AchievementId::random());
        assert_eq!(achievement.title, "First Steps");
        assert_eq!(achievement.description, None);
        assert_eq!(achievement.icon.as_deref(), Some("star"));
    }
}
