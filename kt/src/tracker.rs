//! Session Progression Tracker
//!
//! Decides phase transitions and artifact updates from assistant replies.
//! Every operation takes a session by value and hands back the updated one;
//! persisting it is the caller's job.

use tracing::{debug, info};

use crate::directive::{DirectiveMarkers, contains_directive, strip_directive};
use crate::domain::{LearnerChapterSession, Phase};
use crate::error::ValidationError;

/// Highest accepted quiz score
pub const MAX_QUIZ_SCORE: i64 = 100;

/// Applies directive-driven transitions to learner sessions
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    markers: DirectiveMarkers,
}

impl SessionTracker {
    pub fn new(markers: DirectiveMarkers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &DirectiveMarkers {
        &self.markers
    }

    /// Ingest one assistant reply
    ///
    /// Returns the reply with every marker removed, and the session after any
    /// transition the reply triggered. The plan-ready transition fires only
    /// from `Assessment` with no plan yet; the study plan and the course
    /// resume both store the raw, unstripped reply.
    pub fn ingest_reply(
        &self,
        mut session: LearnerChapterSession,
        raw_reply: &str,
    ) -> (String, LearnerChapterSession) {
        debug!(key = %session.key(), phase = %session.phase(), reply_len = raw_reply.len(), "ingest_reply: called");
        let display_text = strip_directive(raw_reply, &self.markers.all());
        let mut changed = false;

        if contains_directive(raw_reply, &self.markers.plan_ready) {
            if session.phase() == Phase::Assessment && session.study_plan().is_none() {
                info!(key = %session.key(), "ingest_reply: plan ready, advancing to learning");
                session.set_study_plan(raw_reply.to_string());
                session.set_phase(Phase::Learning);
                changed = true;
            } else {
                debug!(phase = %session.phase(), "ingest_reply: plan-ready marker ignored");
            }
        }

        if contains_directive(raw_reply, &self.markers.resume_update) {
            debug!(key = %session.key(), "ingest_reply: course resume updated");
            session.set_course_resume(raw_reply.to_string());
            changed = true;
        }

        if changed {
            session.touch();
        }

        (display_text, session)
    }

    /// Record a quiz score in 0..=100; phase is untouched
    pub fn record_quiz_score(
        &self,
        mut session: LearnerChapterSession,
        score: i64,
    ) -> Result<LearnerChapterSession, ValidationError> {
        debug!(key = %session.key(), %score, "record_quiz_score: called");
        if !(0..=MAX_QUIZ_SCORE).contains(&score) {
            return Err(ValidationError::ScoreOutOfRange(score));
        }
        session.set_latest_quiz_score(score as u8);
        session.touch();
        Ok(session)
    }

    /// Explicitly regenerate the study plan; phase is untouched
    pub fn replace_study_plan(
        &self,
        mut session: LearnerChapterSession,
        plan: &str,
    ) -> Result<LearnerChapterSession, ValidationError> {
        debug!(key = %session.key(), plan_len = plan.len(), "replace_study_plan: called");
        if plan.trim().is_empty() {
            return Err(ValidationError::EmptyStudyPlan);
        }
        session.set_study_plan(plan.to_string());
        session.touch();
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fresh() -> LearnerChapterSession {
        LearnerChapterSession::new("a@x.com", "ch1").unwrap()
    }

    #[test]
    fn test_plan_ready_advances_to_learning() {
        let tracker = SessionTracker::default();
        let (display, session) = tracker.ingest_reply(fresh(), "Here are your results. [PLAN_READY]");

        assert_eq!(display, "Here are your results. ");
        assert_eq!(session.phase(), Phase::Learning);
        assert_eq!(session.study_plan(), Some("Here are your results. [PLAN_READY]"));
    }

    #[test]
    fn test_plan_ready_after_transition_is_noop() {
        let tracker = SessionTracker::default();
        let (_, session) = tracker.ingest_reply(fresh(), "Here are your results. [PLAN_READY]");
        let before = session.clone();

        let (display, session) = tracker.ingest_reply(session, "More info [PLAN_READY]");

        assert_eq!(display, "More info ");
        assert_eq!(session.phase(), Phase::Learning);
        assert_eq!(session.study_plan(), Some("Here are your results. [PLAN_READY]"));
        assert_eq!(session, before);
    }

    #[test]
    fn test_reply_without_markers_changes_nothing() {
        let tracker = SessionTracker::default();
        let (_, session) = tracker.ingest_reply(fresh(), "Here are your results. [PLAN_READY]");
        let before = session.clone();

        let (display, session) = tracker.ingest_reply(session, "Let's review today.");

        assert_eq!(display, "Let's review today.");
        assert_eq!(session, before);
    }

    #[test]
    fn test_empty_reply_is_noop() {
        let tracker = SessionTracker::default();
        let before = fresh();
        let (display, session) = tracker.ingest_reply(before.clone(), "");
        assert_eq!(display, "");
        assert_eq!(session, before);
    }

    #[test]
    fn test_plan_ready_ignored_when_plan_already_set_in_assessment() {
        let tracker = SessionTracker::default();
        let session = tracker.replace_study_plan(fresh(), "out of band plan").unwrap();
        let (_, session) = tracker.ingest_reply(session, "plan [PLAN_READY]");
        assert_eq!(session.phase(), Phase::Assessment);
        assert_eq!(session.study_plan(), Some("out of band plan"));
    }

    #[test]
    fn test_plan_ready_in_mastery_does_not_regress() {
        let tracker = SessionTracker::default();
        let session = LearnerChapterSession::in_phase("a@x.com", "ch1", Phase::Mastery).unwrap();
        let (_, session) = tracker.ingest_reply(session, "[PLAN_READY]");
        assert_eq!(session.phase(), Phase::Mastery);
        assert!(session.study_plan().is_none());
    }

    #[test]
    fn test_resume_update_overwrites_in_any_phase() {
        let tracker = SessionTracker::default();
        let (display, session) = tracker.ingest_reply(fresh(), "Summary one [RESUME_UPDATE]");
        assert_eq!(display, "Summary one ");
        assert_eq!(session.phase(), Phase::Assessment);
        assert_eq!(session.course_resume(), Some("Summary one [RESUME_UPDATE]"));

        let (_, session) = tracker.ingest_reply(session, "Summary two [RESUME_UPDATE]");
        assert_eq!(session.course_resume(), Some("Summary two [RESUME_UPDATE]"));
    }

    #[test]
    fn test_both_markers_in_one_reply() {
        let tracker = SessionTracker::default();
        let raw = "Plan [PLAN_READY] and summary [RESUME_UPDATE]";
        let (display, session) = tracker.ingest_reply(fresh(), raw);
        assert_eq!(display, "Plan  and summary ");
        assert_eq!(session.phase(), Phase::Learning);
        assert_eq!(session.study_plan(), Some(raw));
        assert_eq!(session.course_resume(), Some(raw));
    }

    #[test]
    fn test_custom_marker_vocabulary() {
        let tracker = SessionTracker::new(DirectiveMarkers {
            plan_ready: "<plan-ready/>".to_string(),
            resume_update: "<resume/>".to_string(),
        });
        let (display, session) = tracker.ingest_reply(fresh(), "ok <plan-ready/> [PLAN_READY]");
        assert_eq!(display, "ok  [PLAN_READY]");
        assert_eq!(session.phase(), Phase::Learning);
    }

    #[test]
    fn test_quiz_score_bounds() {
        let tracker = SessionTracker::default();
        assert_eq!(
            tracker.record_quiz_score(fresh(), -1),
            Err(ValidationError::ScoreOutOfRange(-1))
        );
        assert_eq!(
            tracker.record_quiz_score(fresh(), 101),
            Err(ValidationError::ScoreOutOfRange(101))
        );
        assert_eq!(tracker.record_quiz_score(fresh(), 0).unwrap().latest_quiz_score(), Some(0));
        assert_eq!(tracker.record_quiz_score(fresh(), 100).unwrap().latest_quiz_score(), Some(100));
    }

    #[test]
    fn test_quiz_score_rejection_leaves_session_unchanged() {
        let tracker = SessionTracker::default();
        let session = fresh();
        let before = session.clone();
        assert!(tracker.record_quiz_score(session.clone(), 150).is_err());
        assert_eq!(session, before);
    }

    #[test]
    fn test_quiz_score_does_not_change_phase() {
        let tracker = SessionTracker::default();
        let session = tracker.record_quiz_score(fresh(), 42).unwrap();
        assert_eq!(session.phase(), Phase::Assessment);
    }

    #[test]
    fn test_replace_study_plan_rejects_blank() {
        let tracker = SessionTracker::default();
        assert_eq!(
            tracker.replace_study_plan(fresh(), "  \n"),
            Err(ValidationError::EmptyStudyPlan)
        );
    }

    #[test]
    fn test_replace_study_plan_keeps_phase() {
        let tracker = SessionTracker::default();
        let (_, session) = tracker.ingest_reply(fresh(), "first [PLAN_READY]");
        let session = tracker.replace_study_plan(session, "regenerated").unwrap();
        assert_eq!(session.phase(), Phase::Learning);
        assert_eq!(session.study_plan(), Some("regenerated"));
    }

    fn reply() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Question?".to_string()),
            Just("Done [PLAN_READY]".to_string()),
            Just("Summary [RESUME_UPDATE]".to_string()),
            Just(String::new()),
            "[a-zA-Z \\[\\]_]{0,24}",
        ]
    }

    fn start_phase() -> impl Strategy<Value = Phase> {
        prop_oneof![Just(Phase::Assessment), Just(Phase::Learning), Just(Phase::Mastery)]
    }

    proptest! {
        #[test]
        fn prop_phase_never_regresses(phase in start_phase(), replies in prop::collection::vec(reply(), 0..12)) {
            let tracker = SessionTracker::default();
            let mut session = LearnerChapterSession::in_phase("a@x.com", "ch1", phase).unwrap();
            for raw in &replies {
                let before = session.phase();
                let (display, next) = tracker.ingest_reply(session, raw);
                prop_assert!(next.phase() >= before);
                prop_assert!(!display.contains("[PLAN_READY]"));
                prop_assert!(!display.contains("[RESUME_UPDATE]"));
                session = next;
            }
        }

        #[test]
        fn prop_plan_transition_fires_at_most_once(replies in prop::collection::vec(reply(), 0..12)) {
            let tracker = SessionTracker::default();
            let mut session = LearnerChapterSession::new("a@x.com", "ch1").unwrap();
            let mut plan_changes = 0;
            for raw in &replies {
                let before = session.study_plan().map(str::to_string);
                let (_, next) = tracker.ingest_reply(session, raw);
                if next.study_plan().map(str::to_string) != before {
                    plan_changes += 1;
                }
                session = next;
            }
            prop_assert!(plan_changes <= 1);
        }
    }
}
