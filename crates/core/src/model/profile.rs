use chrono::{DateTime, Utc};

use crate::model::course::normalize_optional;
use crate::model::ids::UserId;

/// Learner profile row keyed by the identity provider's user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub professional_field: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Empty profile as created by the backend right after sign-up.
    #[must_use]
    pub fn blank(id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            professional_field: None,
            avatar_url: None,
            is_admin: false,
            updated_at: at,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_owned()),
            (None, None) => None,
        }
    }

    /// Applies the set fields of `update`; `None` leaves a field unchanged.
    pub fn apply(&mut self, update: ProfileUpdate, at: DateTime<Utc>) {
        if let Some(v) = update.first_name {
            self.first_name = normalize_optional(Some(v));
        }
        if let Some(v) = update.last_name {
            self.last_name = normalize_optional(Some(v));
        }
        if let Some(v) = update.professional_field {
            self.professional_field = normalize_optional(Some(v));
        }
        if let Some(v) = update.avatar_url {
            self.avatar_url = normalize_optional(Some(v));
        }
        self.updated_at = at;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub professional_field: Option<String>,
    pub avatar_url: Option<String>,
}
