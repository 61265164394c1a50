//! Azure `OpenAI` / `OpenAI` chat completions provider

use super::types::{LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use crate::config::ServiceTarget;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat completions service for either Azure `OpenAI` or the public API
pub struct ChatCompletionService {
    client: Client,
    api_key: String,
    target: ServiceTarget,
    url: String,
}

impl ChatCompletionService {
    pub fn new(
        api_key: String,
        target: ServiceTarget,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let url = target.chat_url();

        Ok(Self {
            client,
            api_key,
            target,
            url,
        })
    }

    pub(super) fn translate_request(&self, request: &LlmRequest) -> ChatRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.content.clone()),
            })
            .collect();

        ChatRequest {
            model: self.target.model_name().to_string(),
            messages,
            max_tokens: request.sampling.max_tokens,
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
            frequency_penalty: request.sampling.frequency_penalty,
            presence_penalty: request.sampling.presence_penalty,
        }
    }

    pub(super) fn normalize_response(resp: ChatResponse) -> Result<LlmResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let text = choice.message.content.unwrap_or_default();
        let finish_reason = choice.finish_reason;

        if text.trim().is_empty() {
            return Err(if finish_reason.as_deref() == Some("content_filter") {
                LlmError::content_filter("The reply was blocked by the provider's content filter")
            } else {
                LlmError::unknown("Completion contained no text")
            });
        }

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u64::from(u.prompt_tokens),
            output_tokens: u64::from(u.completion_tokens),
        });

        Ok(LlmResponse {
            text,
            finish_reason,
            usage,
        })
    }

    fn classify_error(status: StatusCode, headers: &HeaderMap, body: &str) -> LlmError {
        let parsed = serde_json::from_str::<ChatErrorResponse>(body).ok();
        let message = parsed
            .as_ref()
            .map_or_else(|| body.to_string(), |e| e.error.message.clone());
        let code = parsed.and_then(|e| e.error.code);

        match status.as_u16() {
            401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
            429 => {
                let err = LlmError::rate_limit(format!("Rate limit exceeded: {message}"));
                match retry_after(headers) {
                    Some(delay) => err.with_retry_after(delay),
                    None => err,
                }
            }
            400 if code.as_deref() == Some("content_filter") => {
                LlmError::content_filter(format!("Blocked by content filter: {message}"))
            }
            400 | 404 | 422 => LlmError::invalid_request(format!("Invalid request: {message}")),
            408 => LlmError::timeout(format!("Server timed out: {message}")),
            500..=599 => {
                let err = LlmError::server_error(format!("Server error: {message}"));
                match retry_after(headers) {
                    Some(delay) => err.with_retry_after(delay),
                    None => err,
                }
            }
            _ => LlmError::unknown(format!("HTTP {status}: {message}")),
        }
    }
}

/// Parse a `retry-after` header given in whole or fractional seconds
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

#[async_trait]
impl LlmService for ChatCompletionService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let chat_request = self.translate_request(request);
        let (auth_name, auth_value) = self.target.auth_header(&self.api_key);

        let response = self
            .client
            .post(&self.url)
            .header(auth_name, auth_value)
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &headers, &body));
        }

        let chat_response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e}")))?;

        Self::normalize_response(chat_response)
    }

    fn model_id(&self) -> &str {
        self.target.model_name()
    }
}

// Chat completions API types

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest {
    pub(super) model: String,
    pub(super) messages: Vec<ChatMessage>,
    pub(super) max_tokens: u32,
    pub(super) temperature: f32,
    pub(super) top_p: f32,
    pub(super) frequency_penalty: f32,
    pub(super) presence_penalty: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ChatMessage {
    pub(super) role: String,
    #[serde(default)]
    pub(super) content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponse {
    pub(super) choices: Vec<ChatChoice>,
    #[serde(default)]
    pub(super) usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatChoice {
    pub(super) message: ChatMessage,
    #[serde(default)]
    pub(super) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
pub(super) struct ChatUsage {
    pub(super) prompt_tokens: u32,
    pub(super) completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatErrorResponse {
    error: ChatError,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}
