use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("unsupported interface language: {0}")]
    UnknownLanguage(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InterfaceLanguage {
    #[default]
    English,
    Turkish,
}

impl InterfaceLanguage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InterfaceLanguage::English => "English",
            InterfaceLanguage::Turkish => "Turkish",
        }
    }
}

impl fmt::Display for InterfaceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceLanguage {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "English" => Ok(InterfaceLanguage::English),
            "Turkish" => Ok(InterfaceLanguage::Turkish),
            other => Err(SettingsError::UnknownLanguage(other.to_owned())),
        }
    }
}

/// Per-learner notification and language preferences, one row per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub user_id: UserId,
    pub progress_reminders: bool,
    pub new_content_alerts: bool,
    pub interface_language: InterfaceLanguage,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    /// Values shown before the learner has saved anything.
    #[must_use]
    pub fn defaults(user_id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            progress_reminders: true,
            new_content_alerts: false,
            interface_language: InterfaceLanguage::default(),
            updated_at: at,
        }
    }

    /// Applies the set fields of `update`.
    pub fn apply(&mut self, update: SettingsUpdate, at: DateTime<Utc>) {
        if let Some(v) = update.progress_reminders {
            self.progress_reminders = v;
        }
        if let Some(v) = update.new_content_alerts {
            self.new_content_alerts = v;
        }
        if let Some(v) = update.interface_language {
            self.interface_language = v;
        }
        self.updated_at = at;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub progress_reminders: Option<bool>,
    pub new_content_alerts: Option<bool>,
    pub interface_language: Option<InterfaceLanguage>,
}
