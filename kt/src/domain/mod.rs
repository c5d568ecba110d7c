//! Domain types for KhirMinTaki
//!
//! Core domain types: LearnerChapterSession, Phase, ConversationTurn, Transcript.
//! Persisted types implement the Record trait for KhirStore persistence.

mod id;
mod phase;
mod session;
mod turn;

pub use id::{KEY_SEPARATOR, learner_prefix, session_key, validate_identifier};
pub use phase::Phase;
pub use session::LearnerChapterSession;
pub use turn::{ConversationTurn, Transcript, TurnRole};

// Re-export khirstore types for convenience
pub use khirstore::{Record, Store, now_ms};
