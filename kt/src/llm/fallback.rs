//! Primary/fallback provider chain with a per-attempt timeout

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason};

/// Tries the primary provider, then the fallback once
///
/// Every attempt is bounded by `timeout`. A reply with no usable text counts
/// as a failure. No canned text is ever substituted for a failed call.
pub struct FallbackClient {
    primary: Arc<dyn LlmClient>,
    fallback: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
}

impl FallbackClient {
    pub fn new(primary: Arc<dyn LlmClient>, fallback: Option<Arc<dyn LlmClient>>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    async fn attempt(&self, client: &dyn LlmClient, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(provider = %client.name(), timeout_ms = self.timeout.as_millis() as u64, "attempt: called");
        match tokio::time::timeout(self.timeout, client.complete(request)).await {
            Ok(Ok(response)) => {
                debug!(
                    provider = %client.name(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "attempt: reply received"
                );
                if response.stop_reason != StopReason::EndTurn {
                    warn!(provider = %client.name(), stop_reason = ?response.stop_reason, "attempt: reply cut short");
                }
                if response.usable_text().is_some() {
                    Ok(response)
                } else {
                    debug!(provider = %client.name(), "attempt: empty reply");
                    Err(LlmError::EmptyReply)
                }
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                debug!(provider = %client.name(), "attempt: timed out");
                Err(LlmError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl LlmClient for FallbackClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        request.validate()?;

        let primary_err = match self.attempt(self.primary.as_ref(), request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            warn!(provider = %self.primary.name(), error = %primary_err, "complete: primary failed, no fallback configured");
            return Err(primary_err);
        };

        warn!(
            primary = %self.primary.name(),
            fallback = %fallback.name(),
            error = %primary_err,
            "complete: primary failed, trying fallback"
        );
        match self.attempt(fallback.as_ref(), request).await {
            Ok(response) => Ok(response),
            Err(fallback_err) => {
                warn!(error = %fallback_err, "complete: fallback failed");
                Err(LlmError::AllProvidersFailed {
                    primary: Box::new(primary_err),
                    fallback: Box::new(fallback_err),
                })
            }
        }
    }

    fn name(&self) -> &str {
        self.primary.name()
    }
}
