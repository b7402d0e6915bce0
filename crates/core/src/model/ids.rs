use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error type for parsing an identifier from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[must_use]
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generates a fresh random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a Course
    CourseId
);
uuid_id!(
    /// Unique identifier for a Module within a course
    ModuleId
);
uuid_id!(
    /// Unique identifier for a Lesson
    LessonId
);
uuid_id!(
    /// Unique identifier for a Vocabulary entry
    VocabularyId
);
uuid_id!(
    /// Opaque user identifier issued by the identity provider
    UserId
);
uuid_id!(
    /// Identifier of a persisted UserProgress record
    ProgressId
);
uuid_id!(
    /// Identifier of an Activity log entry
    ActivityId
);
uuid_id!(
    /// Identifier of an earned Achievement
    AchievementId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_id_parses_and_displays() {
        let raw = "6f1c1c8e-2f4b-4d7e-9a55-1f0f4e3c2a10";
        let id: LessonId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn invalid_id_is_rejected() {
        let err = "not-a-uuid".parse::<CourseId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse CourseId from string");
    }

    #[test]
    fn debug_names_the_kind() {
        let id = UserId::new(Uuid::nil());
        assert_eq!(
            format!("{id:?}"),
            "UserId(00000000-0000-0000-0000-000000000000)"
        );
    }
}
