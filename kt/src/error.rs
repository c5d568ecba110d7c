//! Error types shared across the tutor
//!
//! Provider failures and store failures are kept apart so the presentation
//! layer can tell "the tutor is unavailable" from "your progress was not saved".

use thiserror::Error;

use crate::llm::LlmError;
use crate::state::StoreError;

/// Input rejected before any state is touched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Quiz score {0} is outside 0..=100")]
    ScoreOutOfRange(i64),

    #[error("{0} must not be empty")]
    EmptyIdentifier(&'static str),

    #[error("{field} is malformed: {reason}")]
    MalformedIdentifier { field: &'static str, reason: &'static str },

    #[error("Study plan must not be empty")]
    EmptyStudyPlan,

    #[error("Message must not be empty")]
    EmptyMessage,
}

/// Errors surfaced by a tutor interaction
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("The tutor is temporarily unavailable: {0}")]
    TutorUnavailable(#[from] LlmError),

    #[error("Your progress could not be loaded: {0}")]
    ProgressUnavailable(StoreError),

    /// The reply (if any) was produced but the session change was rolled back
    #[error("Your progress could not be saved: {source}")]
    ProgressNotSaved { source: StoreError, reply: Option<String> },

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl TutorError {
    /// Whether the failure came from the inference provider
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, TutorError::TutorUnavailable(_))
    }

    /// Whether the failure came from the store
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            TutorError::ProgressUnavailable(_) | TutorError::ProgressNotSaved { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::ScoreOutOfRange(150).to_string(),
            "Quiz score 150 is outside 0..=100"
        );
        assert_eq!(
            ValidationError::EmptyIdentifier("learner_id").to_string(),
            "learner_id must not be empty"
        );
    }

    #[test]
    fn test_failure_classes_are_distinct() {
        let provider = TutorError::from(LlmError::Timeout(Duration::from_secs(5)));
        assert!(provider.is_provider_failure());
        assert!(!provider.is_store_failure());

        let store = TutorError::ProgressNotSaved {
            source: StoreError::Backend("disk full".to_string()),
            reply: Some("hello".to_string()),
        };
        assert!(store.is_store_failure());
        assert!(!store.is_provider_failure());
        assert_eq!(store.to_string(), "Your progress could not be saved: Store error: disk full");
    }
}
