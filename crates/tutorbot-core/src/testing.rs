//! Scripted connectors and providers for unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::provider::types::{ChatMessage, LlmResponse, Usage};
use crate::provider::{LlmProvider, ModelError};
use crate::selector::{ModelCandidate, ModelConnector, ModelSelector, SelectorOptions};

/// What a scripted model does when connected and invoked.
#[derive(Default)]
pub struct Script {
    pub connect_error: Option<ModelError>,
    pub replies: VecDeque<Result<String, ModelError>>,
}

/// Shared view of every call made against the scripted models.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>,
    connects: Arc<AtomicUsize>,
}

impl CallLog {
    /// Models invoked, in order.
    pub fn models(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, msgs)| msgs.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

/// Connector keyed by model identifier.
pub struct ScriptedConnector {
    scripts: Mutex<HashMap<String, Script>>,
    log: CallLog,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            log: CallLog::default(),
        }
    }

    pub fn fails_to_connect(self, model: &str, error: ModelError) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .connect_error = Some(error);
        self
    }

    pub fn replies(self, model: &str, replies: Vec<Result<&str, ModelError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .replies
            .extend(replies.into_iter().map(|r| r.map(str::to_string)));
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl ModelConnector for ScriptedConnector {
    fn connect(&self, candidate: &ModelCandidate) -> Result<Box<dyn LlmProvider>, ModelError> {
        self.log.connects.fetch_add(1, Ordering::SeqCst);
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.entry(candidate.model.clone()).or_default();
        if let Some(err) = script.connect_error.clone() {
            return Err(err);
        }
        Ok(Box::new(ScriptedProvider {
            model: candidate.model.clone(),
            replies: Mutex::new(std::mem::take(&mut script.replies)),
            log: self.log.clone(),
        }))
    }
}

struct ScriptedProvider {
    model: String,
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    log: CallLog,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<LlmResponse, ModelError> {
        self.log
            .calls
            .lock()
            .unwrap()
            .push((self.model.clone(), messages.to_vec()));
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Provider("script exhausted".into())));
        next.map(|content| LlmResponse {
            content,
            finish_reason: "stop".into(),
            usage: Usage::default(),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

pub fn candidate(model: &str) -> ModelCandidate {
    ModelCandidate::new("openrouter", "https://openrouter.ai/api/v1", model, "sk-test")
}

/// The two-entry Pro/Flash preference list.
pub fn pro_and_flash() -> Vec<ModelCandidate> {
    vec![candidate("pro-model"), candidate("flash-model")]
}

pub fn selector(connector: ScriptedConnector) -> ModelSelector {
    ModelSelector::new(pro_and_flash(), Box::new(connector), SelectorOptions::default())
}
