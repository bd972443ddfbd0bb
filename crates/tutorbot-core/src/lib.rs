//! 📊 tutorbot-core: Core library for the tutorbot conversational tutor.
//!
//! This crate contains the building blocks of a terminal Data Science tutor
//! backed by hosted LLMs:
//!
//! - [`config`] — Typed configuration loading from JSON and the environment
//! - [`provider`] — LLM provider trait, error taxonomy and OpenAI-compatible client
//! - [`selector`] — Model selection with Pro → Flash fallback
//! - [`session`] — Conversation sessions and their append-only transcripts
//! - [`presentation`] — The UI boundary and a terminal implementation
//! - [`chat`] — The interactive loop tying a session to a presenter
//!
//! # Quick Start
//!
//! ```no_run
//! use tutorbot_core::config::Config;
//! use tutorbot_core::selector::{HttpConnector, ModelSelector};
//! use tutorbot_core::session::ConversationSession;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let connector = HttpConnector::new(config.request_timeout())?;
//! let selector = ModelSelector::new(
//!     config.candidates(),
//!     Box::new(connector),
//!     config.selector_options(),
//! );
//!
//! let (mut session, acquisition) = ConversationSession::start(selector)?;
//! println!("Answering with {}", acquisition.model);
//! session.submit("What is overfitting?").await?;
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod config;
pub mod presentation;
pub mod provider;
pub mod selector;
pub mod session;

#[cfg(test)]
mod testing;
