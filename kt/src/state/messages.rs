//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{LearnerChapterSession, Transcript};

/// Errors from store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Store error: {0}")]
    Backend(String),

    #[error("State manager is not running")]
    ChannelClosed,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StoreError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    LoadSession {
        key: String,
        reply: oneshot::Sender<StateResponse<Option<LearnerChapterSession>>>,
    },
    SaveSession {
        session: LearnerChapterSession,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListSessions {
        learner_id: String,
        reply: oneshot::Sender<StateResponse<Vec<LearnerChapterSession>>>,
    },
    LoadTranscript {
        key: String,
        reply: oneshot::Sender<StateResponse<Option<Transcript>>>,
    },
    SaveTranscript {
        transcript: Transcript,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Shutdown
    Shutdown,
}
