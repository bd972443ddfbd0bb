//! Model candidates and the connector that binds them to providers.

use reqwest::{Client, Url};
use std::collections::HashMap;
use std::time::Duration;

use crate::provider::openai::OpenAiProvider;
use crate::provider::{LlmProvider, ModelError};

/// One entry of the model preference list.
#[derive(Clone, PartialEq, Eq)]
pub struct ModelCandidate {
    /// Provider name, e.g. `openrouter`.
    pub provider: String,
    /// Endpoint root, e.g. `https://openrouter.ai/api/v1`.
    pub endpoint: String,
    pub model: String,
    pub credential: String,
    pub extra_headers: HashMap<String, String>,
}

impl ModelCandidate {
    pub fn new(provider: &str, endpoint: &str, model: &str, credential: &str) -> Self {
        Self {
            provider: provider.to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            credential: credential.to_string(),
            extra_headers: HashMap::new(),
        }
    }

    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = headers;
        self
    }
}

impl std::fmt::Debug for ModelCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCandidate")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

/// Builds a bound provider for a candidate.
///
/// Construction is local: it validates the candidate and wires up a
/// client, but performs no network round trip.
pub trait ModelConnector: Send + Sync {
    fn connect(&self, candidate: &ModelCandidate) -> Result<Box<dyn LlmProvider>, ModelError>;
}

/// Connector producing OpenAI-compatible HTTP providers.
pub struct HttpConnector {
    client: Client,
}

impl HttpConnector {
    /// Build the shared HTTP client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, ModelError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl ModelConnector for HttpConnector {
    fn connect(&self, candidate: &ModelCandidate) -> Result<Box<dyn LlmProvider>, ModelError> {
        validate_candidate(candidate)?;
        Ok(Box::new(OpenAiProvider::new(
            &candidate.endpoint,
            &candidate.credential,
            &candidate.model,
            candidate.extra_headers.clone(),
            self.client.clone(),
        )))
    }
}

/// Reject candidates that could never produce a working binding.
pub fn validate_candidate(candidate: &ModelCandidate) -> Result<(), ModelError> {
    let credential = candidate.credential.trim();
    if credential.is_empty() {
        return Err(ModelError::Configuration(format!(
            "no API key configured for provider '{}'",
            candidate.provider
        )));
    }
    if credential.contains("YOUR_") {
        return Err(ModelError::Configuration(format!(
            "API key for provider '{}' is still a placeholder",
            candidate.provider
        )));
    }
    if candidate.model.trim().is_empty() {
        return Err(ModelError::Configuration("model identifier is empty".into()));
    }

    let url = Url::parse(&candidate.endpoint).map_err(|e| {
        ModelError::Configuration(format!("invalid endpoint '{}': {e}", candidate.endpoint))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ModelError::Configuration(format!(
            "endpoint '{}' is not an http(s) URL",
            candidate.endpoint
        )));
    }
    Ok(())
}
