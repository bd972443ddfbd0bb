//! OpenAI-compatible LLM provider.
//!
//! This single implementation covers every provider tutorbot talks to,
//! since each one exposes an OpenAI-compatible chat completions endpoint:
//!
//! - OpenRouter (`https://openrouter.ai/api/v1`)
//! - Hugging Face router (`https://router.huggingface.co/v1`)
//! - Gemini (`https://generativelanguage.googleapis.com/v1beta/openai`)
//!
//! Requests are sent exactly once. Recovery from quota errors is the job of
//! the model selector, not of the transport.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::types::{ChatMessage, LlmResponse, Usage};
use super::{LlmProvider, ModelError};

/// Known provider base URLs.
pub const PROVIDER_URLS: &[(&str, &str)] = &[
    ("openrouter", "https://openrouter.ai/api/v1"),
    ("huggingface", "https://router.huggingface.co/v1"),
    (
        "gemini",
        "https://generativelanguage.googleapis.com/v1beta/openai",
    ),
];

/// Resolve the base URL for a provider, preferring an explicit override.
pub fn resolve_base_url(provider_name: &str, api_base: Option<&str>) -> Option<String> {
    api_base
        .map(|s| s.to_string())
        .or_else(|| {
            PROVIDER_URLS
                .iter()
                .find(|(name, _)| *name == provider_name)
                .map(|(_, url)| url.to_string())
        })
        .map(|url| url.trim_end_matches('/').to_string())
}

/// OpenAI-compatible provider bound to a single model.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    extra_headers: HashMap<String, String>,
}

impl OpenAiProvider {
    /// Create a new provider.
    ///
    /// # Arguments
    /// * `base_url` - Endpoint root, e.g. `https://openrouter.ai/api/v1`
    /// * `api_key` - API key sent as a bearer token
    /// * `model` - Model identifier every request is sent to
    /// * `extra_headers` - Additional headers sent with every request
    /// * `client` - Shared HTTP client (carries the timeouts)
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        extra_headers: HashMap<String, String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        debug!(base_url = %base_url, model, "Initialized LLM provider");

        Self {
            client,
            api_key: api_key.to_string(),
            base_url,
            model: model.to_string(),
            extra_headers,
        }
    }
}

// ── OpenAI API request/response types ───────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageResponse>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageResponse,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct UsageResponse {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Single(ErrorBody),
    Multiple(Vec<ErrorBody>),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ErrorResponse {
    fn message(&self) -> String {
        match self {
            Self::Single(b) => b.error.message.clone(),
            Self::Multiple(v) => v
                .first()
                .map(|b| b.error.message.clone())
                .unwrap_or_else(|| "Unknown error".into()),
        }
    }
}

// ── LlmProvider implementation ──────────────────────────────────────

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmResponse, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature,
        };

        debug!(model = %self.model, url = %url, msg_count = messages.len(), "Sending chat completion request");

        let mut request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        for (name, value) in &self.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.json(&request_body).send().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Provider(format!("request to {} timed out", self.base_url))
            } else {
                ModelError::Provider(format!("network error: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Provider(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            let err_msg = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message())
                .unwrap_or(body);
            return Err(ModelError::from_status(status.as_u16(), &err_msg));
        }

        let completion: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ModelError::Provider(format!("malformed response: {e}")))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Provider("LLM API returned no choices".into()))?;

        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ModelError::Provider("LLM API returned an empty reply".into()))?;

        let usage = completion.usage.map_or(Usage::default(), |u| Usage {
            prompt_tokens: u.prompt_tokens.unwrap_or(0),
            completion_tokens: u.completion_tokens.unwrap_or(0),
            total_tokens: u.total_tokens.unwrap_or(0),
        });

        debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            tokens = usage.total_tokens,
            "Received LLM response"
        );

        Ok(LlmResponse {
            content,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".into()),
            usage,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
