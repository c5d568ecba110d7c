//! LLM Client module for KhirMinTaki
//!
//! Provides the inference provider capability: a stateless client trait, an
//! OpenAI-compatible client (Groq, OpenAI), a Gemini client and a
//! primary/fallback chain with a per-attempt timeout.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

pub mod client;
mod error;
mod fallback;
mod gemini;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use fallback::FallbackClient;
pub use gemini::GeminiClient;
pub use openai::OpenAICompatClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::{LlmConfig, ProviderConfig};

/// Create a client for a single provider
///
/// Supports "groq", "openai" and "gemini".
pub fn create_client(config: &ProviderConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "groq" | "openai" => Ok(Arc::new(OpenAICompatClient::from_config(config)?)),
        "gemini" => Ok(Arc::new(GeminiClient::from_config(config)?)),
        other => Err(LlmError::InvalidRequest(format!(
            "Unknown LLM provider: '{}'. Supported: groq, openai, gemini",
            other
        ))),
    }
}

/// Create the primary/fallback chain used by the tutor
pub fn create_tutor_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(has_fallback = config.fallback.is_some(), timeout_ms = config.timeout_ms, "create_tutor_client: called");
    let primary = create_client(&config.primary)?;
    let fallback = match &config.fallback {
        Some(fallback) => Some(create_client(fallback)?),
        None => None,
    };
    Ok(Arc::new(FallbackClient::new(
        primary,
        fallback,
        Duration::from_millis(config.timeout_ms),
    )))
}
