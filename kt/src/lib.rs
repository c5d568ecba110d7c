//! KhirMinTaki - chapter tutor with persistent learner progress
//!
//! A learner works through a chapter in three phases: a diagnostic
//! assessment, plan-driven learning, and mastery. The tutor model signals
//! progress by embedding directive markers in its replies; the tracker turns
//! those signals into phase transitions and saved study artifacts.
//!
//! # Modules
//!
//! - [`tracker`] - Phase transitions and artifact updates from replies
//! - [`directive`] - Literal marker detection and stripping
//! - [`domain`] - Sessions, phases and conversation turns
//! - [`state`] - Session persistence over KhirStore
//! - [`llm`] - Inference provider clients and the fallback chain
//! - [`tutor`] - One interaction: provider call, ingestion, save
//! - [`prompts`] - System instruction templates
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod directive;
pub mod domain;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod repl;
pub mod state;
pub mod tracker;
pub mod tutor;

// Re-export commonly used types
pub use config::{Config, LlmConfig, TutorConfig};
pub use directive::{DirectiveMarkers, contains_directive, strip_directive};
pub use domain::{ConversationTurn, LearnerChapterSession, Phase, TurnRole};
pub use error::{TutorError, ValidationError};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, create_tutor_client};
pub use prompts::{PromptContext, PromptLoader};
pub use state::{SessionStore, StateManager, StoreError};
pub use tracker::SessionTracker;
pub use tutor::{LearnerProfile, TutorReply, TutorService, TutorSession, save_with_retry};
