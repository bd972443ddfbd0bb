//! LLM provider trait and error taxonomy.
//!
//! Defines the `LlmProvider` trait that all backends must implement.
//! The `openai` module provides an OpenAI-compatible implementation
//! that covers every supported provider (OpenRouter, Hugging Face, Gemini).

pub mod openai;
pub mod types;

use async_trait::async_trait;
use types::{ChatMessage, LlmResponse};

/// Errors raised while binding or invoking a model.
///
/// Every remote failure is classified into one of these three variants so
/// callers can decide whether a fallback candidate is worth trying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Missing or invalid credential, bad endpoint, or unsupported model.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The provider reported a rate or usage limit.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    /// Any other remote failure (network, timeout, malformed response).
    #[error("provider error: {0}")]
    Provider(String),
}

impl ModelError {
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, message: &str) -> Self {
        let detail = format!("HTTP {status}: {message}");
        match status {
            402 | 429 => Self::QuotaExceeded(detail),
            _ if mentions_quota(message) => Self::QuotaExceeded(detail),
            401 | 403 | 404 => Self::Configuration(detail),
            _ => Self::Provider(detail),
        }
    }
}

fn mentions_quota(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["quota", "rate limit", "rate-limit", "insufficient credits"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Trait for LLM providers.
///
/// Any backend that can handle chat completions must implement this trait.
/// One provider instance is bound to exactly one model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages` - System prompt, conversation context and the new message
    /// * `max_tokens` - Maximum response tokens
    /// * `temperature` - Sampling temperature
    async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmResponse, ModelError>;

    /// The model identifier this provider is bound to.
    fn model(&self) -> &str;
}
