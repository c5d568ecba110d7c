//! Google Gemini client implementation
//!
//! Implements the LlmClient trait for the `generateContent` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, Role, StopReason, TokenUsage};
use crate::config::ProviderConfig;

/// Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl GeminiClient {
    /// Create a new client from provider configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|e| LlmError::InvalidRequest(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Build the request body for generateContent
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, message_count = request.messages.len(), "build_request_body: called");
        serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": request.system_prompt }],
            },
            "contents": convert_messages(&request.messages),
            "generationConfig": {
                "maxOutputTokens": request.max_tokens.min(self.max_tokens),
            },
        })
    }

    fn parse_response(&self, api_response: GenerateResponse) -> CompletionResponse {
        debug!(candidate_count = api_response.candidates.len(), "parse_response: called");
        let (content, stop_reason) = match api_response.candidates.into_iter().next() {
            Some(candidate) => {
                let text: String = candidate
                    .content
                    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
                    .unwrap_or_default();
                let stop_reason = match candidate.finish_reason.as_deref() {
                    Some("MAX_TOKENS") => StopReason::MaxTokens,
                    Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => StopReason::ContentFilter,
                    _ => StopReason::EndTurn,
                };
                let content = if text.is_empty() { None } else { Some(text) };
                (content, stop_reason)
            }
            None => (None, StopReason::ContentFilter),
        };

        let usage = api_response
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        CompletionResponse {
            content,
            stop_reason,
            usage,
        }
    }
}

/// Convert messages to Gemini `contents`
///
/// Gemini rejects consecutive turns with the same role, so adjacent messages
/// from the same author are merged into one turn.
fn convert_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    let mut merged: Vec<(&'static str, Vec<&str>)> = Vec::new();
    for msg in messages {
        let role = match msg.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        match merged.last_mut() {
            Some((last_role, texts)) if *last_role == role => {
                texts.push(msg.content.as_str());
                continue;
            }
            _ => {}
        }
        merged.push((role, vec![msg.content.as_str()]));
    }

    merged
        .into_iter()
        .map(|(role, texts)| {
            serde_json::json!({
                "role": role,
                "parts": [{ "text": texts.join("\n\n") }],
            })
        })
        .collect()
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, "complete: called");
        request.validate()?;
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 429 {
            debug!("complete: rate limited (429)");
            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(60),
            });
        }
        if !response.status().is_success() {
            debug!(%status, "complete: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message: text });
        }

        let api_response: GenerateResponse = response.json().await?;
        Ok(self.parse_response(api_response))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// generateContent response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}
