//! Model selection with Pro → Flash fallback.
//!
//! The selector holds an ordered preference list of model candidates and
//! keeps at most one of them bound at a time. `acquire` walks the list until
//! a candidate connects. `invoke` sends a question to the bound model and,
//! when the provider reports an exhausted quota, moves on to the remaining
//! candidates within the same call.

mod candidate;

pub use candidate::{validate_candidate, HttpConnector, ModelCandidate, ModelConnector};

use tracing::{debug, info, warn};

use crate::provider::types::ChatMessage;
use crate::provider::{LlmProvider, ModelError};
use crate::session::{Role, Transcript};

/// Default persona for the tutor.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and rigorous Data Science tutor. \
     Answer questions about statistics, machine learning, data analysis and Python tooling. \
     Explain concepts step by step and use short examples where they help.";

/// Request parameters applied to every invocation.
#[derive(Debug, Clone)]
pub struct SelectorOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: Option<String>,
    /// Number of most recent turns sent as context (0 = all). Rounded down
    /// to whole user/AI exchanges.
    pub max_history_turns: usize,
    /// Re-attempt on the next candidate when the bound one is over quota.
    pub fallback_on_quota: bool,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_history_turns: 40,
            fallback_on_quota: true,
        }
    }
}

/// The active binding: one candidate and the provider built for it.
pub struct ModelHandle {
    index: usize,
    candidate: ModelCandidate,
    provider: Box<dyn LlmProvider>,
}

impl ModelHandle {
    /// Position of the bound candidate in the preference list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn model(&self) -> &str {
        &self.candidate.model
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("index", &self.index)
            .field("candidate", &self.candidate)
            .finish()
    }
}

/// A candidate passed over during acquisition or fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCandidate {
    pub model: String,
    pub provider: String,
    pub error: ModelError,
}

/// Result of a successful `acquire`.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub model: String,
    pub provider: String,
    pub skipped: Vec<SkippedCandidate>,
}

/// A switch to a lower-preference model made during `invoke`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub from: String,
    pub to: String,
    pub reason: ModelError,
}

/// A model reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub content: String,
    /// Model that produced the reply.
    pub model: String,
    pub fallback: Option<Fallback>,
}

/// Chooses and holds the active model binding.
pub struct ModelSelector {
    candidates: Vec<ModelCandidate>,
    connector: Box<dyn ModelConnector>,
    options: SelectorOptions,
    active: Option<ModelHandle>,
}

impl ModelSelector {
    /// Create a selector over `candidates`, highest preference first.
    pub fn new(
        candidates: Vec<ModelCandidate>,
        connector: Box<dyn ModelConnector>,
        options: SelectorOptions,
    ) -> Self {
        Self {
            candidates,
            connector,
            options,
            active: None,
        }
    }

    pub fn candidates(&self) -> &[ModelCandidate] {
        &self.candidates
    }

    /// The currently bound model, if any.
    pub fn active(&self) -> Option<&ModelHandle> {
        self.active.as_ref()
    }

    /// Bind the first candidate that connects.
    ///
    /// Candidates that fail to connect are logged and reported in
    /// [`Acquisition::skipped`]. Fails with [`ModelError::Configuration`]
    /// when no candidate connects.
    pub fn acquire(&mut self) -> Result<Acquisition, ModelError> {
        self.active = None;
        let mut skipped = Vec::new();

        for (index, candidate) in self.candidates.iter().enumerate() {
            match self.connector.connect(candidate) {
                Ok(provider) => {
                    info!(model = %candidate.model, provider = %candidate.provider, "Bound model");
                    self.active = Some(ModelHandle {
                        index,
                        candidate: candidate.clone(),
                        provider,
                    });
                    return Ok(Acquisition {
                        model: candidate.model.clone(),
                        provider: candidate.provider.clone(),
                        skipped,
                    });
                }
                Err(error) => {
                    warn!(
                        model = %candidate.model,
                        provider = %candidate.provider,
                        error = %error,
                        "Model unavailable, trying next candidate"
                    );
                    skipped.push(SkippedCandidate {
                        model: candidate.model.clone(),
                        provider: candidate.provider.clone(),
                        error,
                    });
                }
            }
        }

        if skipped.is_empty() {
            return Err(ModelError::Configuration("no model candidates configured".into()));
        }
        let reasons = skipped
            .iter()
            .map(|s| format!("{}: {}", s.model, s.error))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ModelError::Configuration(format!(
            "no model could be initialised ({reasons})"
        )))
    }

    /// Ask the bound model to answer `message` given the transcript so far.
    pub async fn invoke(
        &mut self,
        transcript: &Transcript,
        message: &str,
    ) -> Result<Reply, ModelError> {
        let messages = self.build_messages(transcript, message);

        let (index, result) = {
            let handle = self.active.as_ref().ok_or_else(|| {
                ModelError::Configuration("no model is bound; acquire() must succeed first".into())
            })?;
            debug!(model = %handle.model(), context = messages.len(), "Invoking model");
            let result = handle
                .provider
                .chat(&messages, self.options.max_tokens, self.options.temperature)
                .await;
            (handle.index, result)
        };

        match result {
            Ok(response) => Ok(Reply {
                content: response.content,
                model: self.candidates[index].model.clone(),
                fallback: None,
            }),
            Err(error) if error.is_quota() && self.options.fallback_on_quota => {
                warn!(model = %self.candidates[index].model, error = %error, "Quota exceeded, falling back");
                self.fall_back(index, error, &messages).await
            }
            Err(error) => Err(error),
        }
    }

    /// Try each candidate after `from`, rebinding to the first that answers.
    async fn fall_back(
        &mut self,
        from: usize,
        reason: ModelError,
        messages: &[ChatMessage],
    ) -> Result<Reply, ModelError> {
        let mut last_error = reason.clone();

        for index in (from + 1)..self.candidates.len() {
            let candidate = &self.candidates[index];
            let provider = match self.connector.connect(candidate) {
                Ok(p) => p,
                Err(e) => {
                    warn!(model = %candidate.model, error = %e, "Fallback model unavailable");
                    continue;
                }
            };

            match provider
                .chat(messages, self.options.max_tokens, self.options.temperature)
                .await
            {
                Ok(response) => {
                    info!(from = %self.candidates[from].model, to = %candidate.model, "Switched model after quota error");
                    let fallback = Fallback {
                        from: self.candidates[from].model.clone(),
                        to: candidate.model.clone(),
                        reason,
                    };
                    self.active = Some(ModelHandle {
                        index,
                        candidate: candidate.clone(),
                        provider,
                    });
                    return Ok(Reply {
                        content: response.content,
                        model: fallback.to.clone(),
                        fallback: Some(fallback),
                    });
                }
                Err(e) if e.is_quota() => {
                    warn!(model = %candidate.model, error = %e, "Fallback model also over quota");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }

    /// System prompt, the most recent turns, then the new question.
    fn build_messages(&self, transcript: &Transcript, message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 2);
        if let Some(ref prompt) = self.options.system_prompt {
            messages.push(ChatMessage::system(prompt));
        }

        // Drop whole exchanges so the context never opens with an AI turn.
        let skip = match self.options.max_history_turns {
            0 => 0,
            max => {
                let excess = transcript.len().saturating_sub(max);
                (excess + excess % 2).min(transcript.len())
            }
        };
        messages.extend(transcript.iter().skip(skip).map(|turn| match turn.role() {
            Role::User => ChatMessage::user(turn.content()),
            Role::Ai => ChatMessage::assistant(turn.content()),
        }));

        messages.push(ChatMessage::user(message));
        messages
    }
}
