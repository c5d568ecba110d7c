//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider returned no usable text")]
    EmptyReply,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("All providers failed (primary: {primary}; fallback: {fallback})")]
    AllProvidersFailed {
        primary: Box<LlmError>,
        fallback: Box<LlmError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_providers_failed_message() {
        let err = LlmError::AllProvidersFailed {
            primary: Box::new(LlmError::Timeout(Duration::from_secs(1))),
            fallback: Box::new(LlmError::EmptyReply),
        };
        assert_eq!(
            err.to_string(),
            "All providers failed (primary: Timeout after 1s; fallback: Provider returned no usable text)"
        );
    }
}
