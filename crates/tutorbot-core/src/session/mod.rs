//! Conversation sessions and their transcripts.
//!
//! A session owns an append-only transcript and mediates every user
//! question through the model selector. A question and its reply are
//! appended together or not at all.

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::provider::ModelError;
use crate::selector::{Acquisition, Fallback, ModelSelector};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Ai,
}

/// One message of the conversation. Immutable once created.
#[derive(Debug, Clone)]
pub struct Turn {
    role: Role,
    content: String,
    created_at: DateTime<Local>,
}

impl Turn {
    fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            created_at: Local::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

/// Ordered, append-only list of turns.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns in append order. The iterator is cheap to clone and restart.
    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Append a user question and the AI reply, in that order.
    pub(crate) fn append_exchange(&mut self, question: &str, reply: &str) {
        self.turns.push(Turn::new(Role::User, question));
        self.turns.push(Turn::new(Role::Ai, reply));
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// What a call to [`ConversationSession::submit`] did.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Blank input; nothing was sent and nothing was recorded.
    Ignored,
    /// The exchange was appended to the transcript.
    Answered {
        reply: String,
        model: String,
        fallback: Option<Fallback>,
    },
}

/// One interactive conversation.
pub struct ConversationSession {
    id: Uuid,
    transcript: Transcript,
    selector: ModelSelector,
}

impl ConversationSession {
    /// Acquire a model and open a session on it.
    ///
    /// Fails without creating a session when no candidate can be bound, so
    /// no input is ever accepted without a model behind it.
    pub fn start(mut selector: ModelSelector) -> Result<(Self, Acquisition), ModelError> {
        let acquisition = selector.acquire()?;
        let session = Self {
            id: Uuid::new_v4(),
            transcript: Transcript::new(),
            selector,
        };
        info!(session = %session.id, model = %acquisition.model, "Session started");
        Ok((session, acquisition))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn selector(&self) -> &ModelSelector {
        &self.selector
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Send a question to the model and record the exchange.
    ///
    /// Blank questions are ignored without a remote call. On error the
    /// transcript is left untouched and the session stays usable.
    pub async fn submit(&mut self, question: &str) -> Result<SubmitOutcome, ModelError> {
        if question.trim().is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        debug!(session = %self.id, turns = self.transcript.len(), "Submitting question");

        match self.selector.invoke(&self.transcript, question).await {
            Ok(reply) => {
                self.transcript.append_exchange(question, &reply.content);
                Ok(SubmitOutcome::Answered {
                    reply: reply.content,
                    model: reply.model,
                    fallback: reply.fallback,
                })
            }
            Err(error) => {
                warn!(session = %self.id, error = %error, "Question failed");
                Err(error)
            }
        }
    }

    /// The transcript in chronological order.
    pub fn history(&self) -> std::slice::Iter<'_, Turn> {
        self.transcript.iter()
    }

    /// End the conversation and begin a new one on the same model binding.
    ///
    /// Returns the discarded transcript.
    pub fn restart(&mut self) -> Transcript {
        let old = std::mem::take(&mut self.transcript);
        self.id = Uuid::new_v4();
        info!(session = %self.id, discarded_turns = old.len(), "Session restarted");
        old
    }
}
