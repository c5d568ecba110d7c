//! Session persistence
//!
//! [`SessionStore`] is the narrow interface the tutor persists through.
//! [`StateManager`] implements it as an actor that owns the SQLite-backed
//! KhirStore and processes commands via channels.

use async_trait::async_trait;

use crate::domain::{ConversationTurn, LearnerChapterSession};

mod manager;
mod messages;

pub use manager::StateManager;
pub use messages::{StateCommand, StateResponse, StoreError};

/// Persistence adapter for learner sessions
///
/// `save_session` is an upsert keyed by (learner, chapter). Concurrent writers
/// for the same key are not coordinated: the last save wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_session(
        &self,
        learner_id: &str,
        chapter_id: &str,
    ) -> Result<Option<LearnerChapterSession>, StoreError>;

    async fn save_session(&self, session: &LearnerChapterSession) -> Result<(), StoreError>;

    /// Saved conversation for a session key; stores without history return nothing
    async fn load_transcript(&self, _session_key: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        Ok(Vec::new())
    }

    /// Replace the saved conversation for a session key
    async fn save_transcript(&self, _session_key: &str, _turns: &[ConversationTurn]) -> Result<(), StoreError> {
        Ok(())
    }
}
