//! Tutor interaction service
//!
//! One interaction is one submitted message, processed in order: provider
//! call, reply ingestion, session save. The service holds no per-learner
//! state; every call works on an explicit [`TutorSession`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TutorConfig;
use crate::directive::contains_directive;
use crate::domain::{ConversationTurn, LearnerChapterSession, Phase, TurnRole, validate_identifier};
use crate::error::{TutorError, ValidationError};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};
use crate::prompts::{PromptContext, PromptLoader};
use crate::state::{SessionStore, StoreError};
use crate::tracker::SessionTracker;

/// Who the tutor is talking to; feeds the system instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerProfile {
    pub subject: String,

    /// Baccalaureate track
    pub track: String,

    pub level: String,

    /// Preferred teaching style
    pub style: String,
}

impl Default for LearnerProfile {
    fn default() -> Self {
        Self {
            subject: "Mathematics".to_string(),
            track: "Sciences".to_string(),
            level: "average".to_string(),
            style: "step by step".to_string(),
        }
    }
}

/// A learner's open chapter: the persisted session plus working memory
#[derive(Debug, Clone)]
pub struct TutorSession {
    session: LearnerChapterSession,
    turns: Vec<ConversationTurn>,
    profile: LearnerProfile,
    assessment_asked: u32,
    assessment_total: u32,
}

impl TutorSession {
    pub fn session(&self) -> &LearnerChapterSession {
        &self.session
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn profile(&self) -> &LearnerProfile {
        &self.profile
    }

    /// `(asked, total)` diagnostic questions, only while assessing
    pub fn assessment_progress(&self) -> Option<(u32, u32)> {
        (self.session.phase() == Phase::Assessment)
            .then(|| (self.assessment_asked.min(self.assessment_total), self.assessment_total))
    }
}

/// Outcome of one submitted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorReply {
    /// Reply with every directive marker removed
    pub text: String,
    pub phase: Phase,
    pub phase_changed: bool,
    pub resume_updated: bool,
}

/// Drives tutor interactions for any number of learners
pub struct TutorService {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn SessionStore>,
    tracker: SessionTracker,
    prompts: PromptLoader,
    config: TutorConfig,
}

impl TutorService {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn SessionStore>,
        tracker: SessionTracker,
        prompts: PromptLoader,
        config: TutorConfig,
    ) -> Self {
        Self {
            llm,
            store,
            tracker,
            prompts,
            config,
        }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Open (or lazily create) a learner's chapter
    ///
    /// A store failure while loading is fatal. A new session is saved right
    /// away in the assessment phase. A fresh conversation starts with a local
    /// greeting; no provider call is made.
    pub async fn open_chapter(
        &self,
        learner_id: &str,
        chapter_id: &str,
        profile: LearnerProfile,
    ) -> Result<TutorSession, TutorError> {
        debug!(%learner_id, %chapter_id, "open_chapter: called");
        validate_identifier("learner_id", learner_id)?;
        validate_identifier("chapter_id", chapter_id)?;

        let session = match self
            .store
            .load_session(learner_id, chapter_id)
            .await
            .map_err(TutorError::ProgressUnavailable)?
        {
            Some(session) => {
                debug!(phase = %session.phase(), "open_chapter: resuming session");
                session
            }
            None => {
                info!(%learner_id, %chapter_id, "open_chapter: creating session");
                let session = LearnerChapterSession::new(learner_id, chapter_id)?;
                save_with_retry(self.store.as_ref(), &session, self.config.save_retries)
                    .await
                    .map_err(|source| TutorError::ProgressNotSaved { source, reply: None })?;
                session
            }
        };

        let turns = match self.store.load_transcript(session.key()).await {
            Ok(turns) => turns,
            Err(e) => {
                warn!(key = %session.key(), error = %e, "open_chapter: transcript unavailable, starting fresh");
                Vec::new()
            }
        };

        let mut tutor = TutorSession {
            assessment_asked: count_questions(&turns),
            assessment_total: self.config.assessment_questions,
            session,
            turns,
            profile,
        };

        if tutor.turns.is_empty() {
            let greeting = self
                .prompts
                .greeting(&self.prompt_context(&tutor))
                .map_err(|e| TutorError::Prompt(e.to_string()))?;
            tutor.turns.push(ConversationTurn::assistant(greeting));
            self.persist_transcript(&tutor).await;
        }

        Ok(tutor)
    }

    /// Submit one learner message and ingest the tutor's reply
    ///
    /// On provider failure the message is withdrawn and the session is left
    /// untouched. If the resulting session change cannot be saved, it is
    /// rolled back and the reply travels inside `ProgressNotSaved`.
    pub async fn send_message(&self, tutor: &mut TutorSession, text: &str) -> Result<TutorReply, TutorError> {
        debug!(key = %tutor.session.key(), phase = %tutor.session.phase(), "send_message: called");
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let system_prompt = self
            .prompts
            .system_prompt(tutor.session.phase(), &self.prompt_context(tutor))
            .map_err(|e| TutorError::Prompt(e.to_string()))?;

        tutor.turns.push(ConversationTurn::user(text));
        let request = CompletionRequest {
            system_prompt,
            messages: self.history_window(&tutor.turns),
            max_tokens: self.config.max_tokens,
        };

        let raw = match self.llm.complete(request).await {
            Ok(response) => match response.usable_text() {
                Some(raw) => raw.to_string(),
                None => {
                    tutor.turns.pop();
                    return Err(LlmError::EmptyReply.into());
                }
            },
            Err(e) => {
                warn!(provider = %self.llm.name(), error = %e, "send_message: provider failed");
                tutor.turns.pop();
                return Err(e.into());
            }
        };

        let before = tutor.session.clone();
        let (display, updated) = self.tracker.ingest_reply(before.clone(), &raw);

        if updated != before {
            debug!(key = %updated.key(), "send_message: session changed, saving");
            if let Err(source) = save_with_retry(self.store.as_ref(), &updated, self.config.save_retries).await {
                warn!(key = %updated.key(), error = %source, "send_message: save failed, rolling back");
                tutor.turns.pop();
                return Err(TutorError::ProgressNotSaved {
                    source,
                    reply: Some(display),
                });
            }
        }

        if before.phase() == Phase::Assessment {
            tutor.assessment_asked += 1;
        }
        let reply = TutorReply {
            text: display.clone(),
            phase: updated.phase(),
            phase_changed: updated.phase() != before.phase(),
            resume_updated: contains_directive(&raw, &self.tracker.markers().resume_update),
        };
        tutor.session = updated;
        tutor.turns.push(ConversationTurn::assistant(display));
        self.persist_transcript(tutor).await;

        if reply.phase_changed {
            info!(key = %tutor.session.key(), phase = %reply.phase, "send_message: phase advanced");
        }
        Ok(reply)
    }

    /// Record a quiz score (0..=100) and save it
    pub async fn submit_quiz_score(&self, tutor: &mut TutorSession, score: i64) -> Result<(), TutorError> {
        debug!(key = %tutor.session.key(), %score, "submit_quiz_score: called");
        let updated = self.tracker.record_quiz_score(tutor.session.clone(), score)?;
        self.commit(tutor, updated).await
    }

    /// Replace the study plan with an explicitly regenerated one
    pub async fn replace_study_plan(&self, tutor: &mut TutorSession, plan: &str) -> Result<(), TutorError> {
        debug!(key = %tutor.session.key(), "replace_study_plan: called");
        let updated = self.tracker.replace_study_plan(tutor.session.clone(), plan)?;
        self.commit(tutor, updated).await
    }

    async fn commit(&self, tutor: &mut TutorSession, updated: LearnerChapterSession) -> Result<(), TutorError> {
        save_with_retry(self.store.as_ref(), &updated, self.config.save_retries)
            .await
            .map_err(|source| TutorError::ProgressNotSaved { source, reply: None })?;
        tutor.session = updated;
        Ok(())
    }

    fn prompt_context(&self, tutor: &TutorSession) -> PromptContext {
        PromptContext::for_session(
            &tutor.profile,
            &tutor.session,
            self.tracker.markers(),
            self.config.assessment_questions,
        )
    }

    /// The most recent `history-window` turns as provider messages
    fn history_window(&self, turns: &[ConversationTurn]) -> Vec<Message> {
        let start = turns.len().saturating_sub(self.config.history_window.max(1));
        turns[start..]
            .iter()
            .map(|turn| match turn.role {
                TurnRole::User => Message::user(turn.text.as_str()),
                TurnRole::Assistant => Message::assistant(turn.text.as_str()),
            })
            .collect()
    }

    async fn persist_transcript(&self, tutor: &TutorSession) {
        if let Err(e) = self.store.save_transcript(tutor.session.key(), &tutor.turns).await {
            warn!(key = %tutor.session.key(), error = %e, "persist_transcript: transcript not saved");
        }
    }
}

/// Save a session, retrying up to `retries` more times on failure
pub async fn save_with_retry(
    store: &dyn SessionStore,
    session: &LearnerChapterSession,
    retries: u32,
) -> Result<(), StoreError> {
    let mut attempt = 0;
    loop {
        match store.save_session(session).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!(key = %session.key(), attempt, error = %e, "save_with_retry: retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

// Assistant replies after the opening greeting
fn count_questions(turns: &[ConversationTurn]) -> u32 {
    turns
        .iter()
        .skip(1)
        .filter(|t| t.role == TurnRole::Assistant)
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionResponse;
    use crate::llm::client::mock::MockLlmClient;
    use crate::state::StateManager;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// In-memory store whose first `failing_saves` saves fail
    #[derive(Default)]
    struct FlakyStore {
        sessions: Mutex<HashMap<String, LearnerChapterSession>>,
        failing_saves: AtomicU32,
        save_calls: AtomicU32,
        fail_loads: bool,
    }

    impl FlakyStore {
        fn failing(saves: u32) -> Self {
            Self {
                failing_saves: AtomicU32::new(saves),
                ..Default::default()
            }
        }

        fn stored(&self, key: &str) -> Option<LearnerChapterSession> {
            self.sessions.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl SessionStore for FlakyStore {
        async fn load_session(
            &self,
            learner_id: &str,
            chapter_id: &str,
        ) -> Result<Option<LearnerChapterSession>, StoreError> {
            if self.fail_loads {
                return Err(StoreError::Backend("disk gone".to_string()));
            }
            let key = crate::domain::session_key(learner_id, chapter_id);
            Ok(self.sessions.lock().unwrap().get(&key).cloned())
        }

        async fn save_session(&self, session: &LearnerChapterSession) -> Result<(), StoreError> {
            self.save_calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failing_saves.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failing_saves.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Backend("write failed".to_string()));
            }
            self.sessions
                .lock()
                .unwrap()
                .insert(session.key().to_string(), session.clone());
            Ok(())
        }
    }

    fn service(llm: Arc<dyn LlmClient>, store: Arc<dyn SessionStore>) -> TutorService {
        TutorService::new(
            llm,
            store,
            SessionTracker::default(),
            PromptLoader::embedded_only(),
            TutorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_open_chapter_creates_and_greets() {
        let store = Arc::new(FlakyStore::default());
        let llm = Arc::new(MockLlmClient::replies(&[]));
        let svc = service(llm.clone(), store.clone());

        let tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();
        assert_eq!(tutor.session().phase(), Phase::Assessment);
        assert!(tutor.session().study_plan().is_none());
        assert_eq!(tutor.turns().len(), 1);
        assert_eq!(tutor.turns()[0].role, TurnRole::Assistant);
        assert!(tutor.turns()[0].text.contains("Mathematics"));
        assert_eq!(tutor.assessment_progress(), Some((0, 10)));
        assert!(store.stored("a@x.com::ch1").is_some());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_open_chapter_rejects_bad_identifiers() {
        let svc = service(Arc::new(MockLlmClient::replies(&[])), Arc::new(FlakyStore::default()));
        let err = svc.open_chapter("", "ch1", LearnerProfile::default()).await.unwrap_err();
        assert!(matches!(err, TutorError::Validation(ValidationError::EmptyIdentifier("learner_id"))));
    }

    #[tokio::test]
    async fn test_open_chapter_load_failure_is_fatal() {
        let store = Arc::new(FlakyStore {
            fail_loads: true,
            ..Default::default()
        });
        let svc = service(Arc::new(MockLlmClient::replies(&[])), store);
        let err = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap_err();
        assert!(matches!(err, TutorError::ProgressUnavailable(_)));
    }

    #[tokio::test]
    async fn test_plan_ready_reply_advances_and_saves() {
        let store = Arc::new(FlakyStore::default());
        let llm = Arc::new(MockLlmClient::replies(&["Question 1?", "Your plan: 1. limits [PLAN_READY]"]));
        let svc = service(llm, store.clone());
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();

        let first = svc.send_message(&mut tutor, "ready").await.unwrap();
        assert_eq!(first.text, "Question 1?");
        assert!(!first.phase_changed);
        assert_eq!(tutor.assessment_progress(), Some((1, 10)));

        let second = svc.send_message(&mut tutor, "x = 2").await.unwrap();
        assert_eq!(second.text, "Your plan: 1. limits ");
        assert!(second.phase_changed);
        assert_eq!(second.phase, Phase::Learning);
        assert_eq!(tutor.assessment_progress(), None);

        let stored = store.stored("a@x.com::ch1").unwrap();
        assert_eq!(stored.phase(), Phase::Learning);
        assert_eq!(stored.study_plan(), Some("Your plan: 1. limits [PLAN_READY]"));
        assert_eq!(tutor.turns().last().unwrap().text, "Your plan: 1. limits ");
    }

    #[tokio::test]
    async fn test_history_window_bounds_request() {
        let llm = Arc::new(MockLlmClient::replies(&["q1", "q2", "q3"]));
        let svc = service(llm.clone(), Arc::new(FlakyStore::default()));
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();

        for msg in ["one", "two", "three"] {
            svc.send_message(&mut tutor, msg).await.unwrap();
        }

        let request = llm.last_request().unwrap();
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].content, "two");
        assert_eq!(request.messages[2].content, "three");
        assert!(request.system_prompt.contains("[PLAN_READY]"));
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_session_untouched() {
        let store = Arc::new(FlakyStore::default());
        let llm = Arc::new(MockLlmClient::new(vec![Err(LlmError::Timeout(std::time::Duration::from_secs(60)))]));
        let svc = service(llm, store.clone());
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();
        let saves_before = store.save_calls.load(Ordering::SeqCst);

        let err = svc.send_message(&mut tutor, "hello").await.unwrap_err();
        assert!(err.is_provider_failure());
        assert_eq!(tutor.turns().len(), 1);
        assert_eq!(tutor.session().phase(), Phase::Assessment);
        assert_eq!(store.save_calls.load(Ordering::SeqCst), saves_before);
    }

    #[tokio::test]
    async fn test_blank_reply_is_unavailable() {
        let llm = Arc::new(MockLlmClient::new(vec![Ok(CompletionResponse::text("  "))]));
        let svc = service(llm, Arc::new(FlakyStore::default()));
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();

        let err = svc.send_message(&mut tutor, "hello").await.unwrap_err();
        assert!(matches!(err, TutorError::TutorUnavailable(LlmError::EmptyReply)));
    }

    #[tokio::test]
    async fn test_empty_message_rejected_before_provider_call() {
        let llm = Arc::new(MockLlmClient::replies(&["x"]));
        let svc = service(llm.clone(), Arc::new(FlakyStore::default()));
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();

        let err = svc.send_message(&mut tutor, "   ").await.unwrap_err();
        assert!(matches!(err, TutorError::Validation(ValidationError::EmptyMessage)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_save_retry_recovers_from_one_failure() {
        let store = Arc::new(FlakyStore::default());
        let llm = Arc::new(MockLlmClient::replies(&["plan [PLAN_READY]"]));
        let svc = service(llm, store.clone());
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();

        store.failing_saves.store(1, Ordering::SeqCst);
        let reply = svc.send_message(&mut tutor, "done").await.unwrap();
        assert!(reply.phase_changed);
        assert_eq!(store.stored("a@x.com::ch1").unwrap().phase(), Phase::Learning);
    }

    #[tokio::test]
    async fn test_save_failure_rolls_back_and_keeps_reply() {
        let store = Arc::new(FlakyStore::default());
        let llm = Arc::new(MockLlmClient::replies(&["plan [PLAN_READY]"]));
        let svc = service(llm, store.clone());
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();

        store.failing_saves.store(2, Ordering::SeqCst);
        let err = svc.send_message(&mut tutor, "done").await.unwrap_err();
        match err {
            TutorError::ProgressNotSaved { reply, .. } => assert_eq!(reply.as_deref(), Some("plan ")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(tutor.session().phase(), Phase::Assessment);
        assert!(tutor.session().study_plan().is_none());
        assert_eq!(tutor.turns().len(), 1);
        assert_eq!(store.stored("a@x.com::ch1").unwrap().phase(), Phase::Assessment);
    }

    #[tokio::test]
    async fn test_quiz_score_validated_and_saved() {
        let store = Arc::new(FlakyStore::default());
        let svc = service(Arc::new(MockLlmClient::replies(&[])), store.clone());
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();

        let err = svc.submit_quiz_score(&mut tutor, 101).await.unwrap_err();
        assert!(matches!(err, TutorError::Validation(ValidationError::ScoreOutOfRange(101))));

        svc.submit_quiz_score(&mut tutor, 100).await.unwrap();
        assert_eq!(tutor.session().latest_quiz_score(), Some(100));
        assert_eq!(store.stored("a@x.com::ch1").unwrap().latest_quiz_score(), Some(100));
        assert_eq!(tutor.session().phase(), Phase::Assessment);
    }

    #[tokio::test]
    async fn test_quiz_score_not_saved_keeps_old_value() {
        let store = Arc::new(FlakyStore::default());
        let svc = service(Arc::new(MockLlmClient::replies(&[])), store.clone());
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();

        store.failing_saves.store(2, Ordering::SeqCst);
        let err = svc.submit_quiz_score(&mut tutor, 50).await.unwrap_err();
        assert!(err.is_store_failure());
        assert_eq!(tutor.session().latest_quiz_score(), None);
    }

    #[tokio::test]
    async fn test_replace_study_plan_keeps_phase() {
        let store = Arc::new(FlakyStore::default());
        let svc = service(Arc::new(MockLlmClient::replies(&[])), store.clone());
        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();

        svc.replace_study_plan(&mut tutor, "1. revise limits").await.unwrap();
        assert_eq!(tutor.session().study_plan(), Some("1. revise limits"));
        assert_eq!(tutor.session().phase(), Phase::Assessment);
        assert!(svc.replace_study_plan(&mut tutor, " ").await.is_err());
    }

    #[tokio::test]
    async fn test_resumed_chapter_replays_transcript() {
        let store = Arc::new(StateManager::spawn_in_memory().unwrap());
        let llm = Arc::new(MockLlmClient::replies(&["Question 1?"]));
        let svc = service(llm, store.clone());

        let mut tutor = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();
        svc.send_message(&mut tutor, "ready").await.unwrap();

        let resumed = svc.open_chapter("a@x.com", "ch1", LearnerProfile::default()).await.unwrap();
        assert_eq!(resumed.turns(), tutor.turns());
        assert_eq!(resumed.assessment_progress(), Some((1, 10)));
    }

    #[tokio::test]
    async fn test_save_with_retry_gives_up() {
        let store = FlakyStore::failing(3);
        let session = LearnerChapterSession::new("a@x.com", "ch1").unwrap();
        assert!(save_with_retry(&store, &session, 1).await.is_err());
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 2);
    }
}
