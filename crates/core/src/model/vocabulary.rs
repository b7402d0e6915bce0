use thiserror::Error;

use crate::model::course::normalize_optional;
use crate::model::ids::{LessonId, VocabularyId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VocabularyError {
    #[error("vocabulary term cannot be empty")]
    EmptyTerm,

    #[error("vocabulary definition cannot be empty")]
    EmptyDefinition,
}

/// A glossary entry attached to a lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    id: VocabularyId,
    lesson_id: LessonId,
    term: String,
    definition: String,
    example_sentence: Option<String>,
    pronunciation: Option<String>,
}

impl Vocabulary {
    /// # Errors
    ///
    /// Returns `VocabularyError` if the term or definition is blank.
    pub fn new(
        id: VocabularyId,
        lesson_id: LessonId,
        term: impl Into<String>,
        definition: impl Into<String>,
        example_sentence: Option<String>,
        pronunciation: Option<String>,
    ) -> Result<Self, VocabularyError> {
        let term = term.into().trim().to_owned();
        if term.is_empty() {
            return Err(VocabularyError::EmptyTerm);
        }
        let definition = definition.into().trim().to_owned();
        if definition.is_empty() {
            return Err(VocabularyError::EmptyDefinition);
        }
        Ok(Self {
            id,
            lesson_id,
            term,
            definition,
            example_sentence: normalize_optional(example_sentence),
            pronunciation: normalize_optional(pronunciation),
        })
    }

    #[must_use]
    pub fn id(&self) -> VocabularyId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    #[must_use]
    pub fn example_sentence(&self) -> Option<&str> {
        self.example_sentence.as_deref()
    }

    #[must_use]
    pub fn pronunciation(&self) -> Option<&str> {
        self.pronunciation.as_deref()
    }
}

/// Sorts entries the way the glossary tab lists them: by term, case-insensitively.
pub fn sort_by_term(entries: &mut [Vocabulary]) {
    entries.sort_by(|a, b| {
        a.term
            .to_lowercase()
            .cmp(&b.term.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyDraft {
    pub id: Option<VocabularyId>,
    pub lesson_id: LessonId,
    pub term: String,
    pub definition: String,
    pub example_sentence: Option<String>,
    pub pronunciation: Option<String>,
}

impl VocabularyDraft {
    /// # Errors
    ///
    /// Returns `VocabularyError` if the draft does not form a valid entry.
    pub fn validate(self) -> Result<Vocabulary, VocabularyError> {
        Vocabulary::new(
            self.id.unwrap_or_else(VocabularyId::random),
            self.lesson_id,
            self.term,
            self.definition,
            self.example_sentence,
            self.pronunciation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(term: &str) -> Vocabulary {
        Vocabulary::new(
            VocabularyId::random(),
            LessonId::random(),
            term,
            "meaning",
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn sorts_terms_case_insensitively() {
        let mut entries = vec![entry("router"), entry("Bandwidth"), entry("firewall")];
        sort_by_term(&mut entries);
        let terms: Vec<_> = entries.iter().map(Vocabulary::term).collect();
        assert_eq!(terms, ["Bandwidth", "firewall", "router"]);
    }

    #[test]
    fn rejects_blank_definition() {
        let err = Vocabulary::new(
            VocabularyId::random(),
            LessonId::random(),
            "voltage",
            " ",
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err, VocabularyError::EmptyDefinition);
    }
}
