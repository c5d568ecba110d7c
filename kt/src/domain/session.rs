//! LearnerChapterSession domain type
//!
//! The persisted state of one learner studying one chapter.

use khirstore::{Record, now_ms};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::{session_key, validate_identifier};
use super::phase::Phase;
use crate::error::ValidationError;

/// Progress of one learner in one chapter
///
/// Fields are read-only outside the crate: phase and artifacts change only
/// through [`SessionTracker`](crate::tracker::SessionTracker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerChapterSession {
    /// Store key, derived from learner and chapter
    id: String,

    learner_id: String,

    chapter_id: String,

    phase: Phase,

    /// Set once when the assessment finishes
    #[serde(default)]
    study_plan: Option<String>,

    /// Running course summary, overwritten on every update
    #[serde(default)]
    course_resume: Option<String>,

    /// Latest quiz score, 0..=100
    #[serde(default)]
    latest_quiz_score: Option<u8>,

    /// Creation timestamp (Unix milliseconds)
    created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    updated_at: i64,
}

impl LearnerChapterSession {
    /// Create a fresh session in the assessment phase with no artifacts
    pub fn new(learner_id: impl Into<String>, chapter_id: impl Into<String>) -> Result<Self, ValidationError> {
        Self::in_phase(learner_id, chapter_id, Phase::Assessment)
    }

    /// Create a session directly in the given phase
    ///
    /// This is the only way to obtain a `Mastery` session.
    pub fn in_phase(
        learner_id: impl Into<String>,
        chapter_id: impl Into<String>,
        phase: Phase,
    ) -> Result<Self, ValidationError> {
        let learner_id = learner_id.into();
        let chapter_id = chapter_id.into();
        debug!(%learner_id, %chapter_id, %phase, "LearnerChapterSession::in_phase: called");
        validate_identifier("learner_id", &learner_id)?;
        validate_identifier("chapter_id", &chapter_id)?;

        let now = now_ms();
        Ok(Self {
            id: session_key(&learner_id, &chapter_id),
            learner_id,
            chapter_id,
            phase,
            study_plan: None,
            course_resume: None,
            latest_quiz_score: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn key(&self) -> &str {
        &self.id
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn chapter_id(&self) -> &str {
        &self.chapter_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn study_plan(&self) -> Option<&str> {
        self.study_plan.as_deref()
    }

    pub fn course_resume(&self) -> Option<&str> {
        self.course_resume.as_deref()
    }

    pub fn latest_quiz_score(&self) -> Option<u8> {
        self.latest_quiz_score
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_study_plan(&mut self, plan: String) {
        self.study_plan = Some(plan);
    }

    pub(crate) fn set_course_resume(&mut self, resume: String) {
        self.course_resume = Some(resume);
    }

    pub(crate) fn set_latest_quiz_score(&mut self, score: u8) {
        self.latest_quiz_score = Some(score);
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = now_ms().max(self.updated_at);
    }
}

impl Record for LearnerChapterSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "sessions"
    }
}
