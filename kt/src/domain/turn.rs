//! Conversation turns and their optional persisted transcript

use khirstore::{Record, now_ms};
use serde::{Deserialize, Serialize};

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One message in a learner-chapter conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// Saved history of a learner-chapter conversation, keyed like the session
///
/// Assistant turns hold display text (markers already stripped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub turns: Vec<ConversationTurn>,
    pub updated_at: i64,
}

impl Transcript {
    pub fn new(session_key: impl Into<String>, turns: Vec<ConversationTurn>) -> Self {
        Self {
            id: session_key.into(),
            turns,
            updated_at: now_ms(),
        }
    }
}

impl Record for Transcript {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "transcripts"
    }
}
