//! The user-facing surface of a chat.
//!
//! The core only needs four things from a UI: show the transcript, read the
//! next question, and show error or warning banners that cannot be mistaken
//! for model replies.

pub mod terminal;

use std::io;

use crate::session::Transcript;

pub use terminal::TerminalPresenter;

/// A UI capable of hosting a conversation.
pub trait Presenter {
    /// Bring the display up to date with `transcript`.
    fn render(&mut self, transcript: &Transcript) -> io::Result<()>;

    /// Block until the user submits a line. `None` means input is closed.
    fn next_submission(&mut self) -> io::Result<Option<String>>;

    fn show_error(&mut self, message: &str) -> io::Result<()>;

    fn show_warning(&mut self, message: &str) -> io::Result<()>;

    /// Neutral status text (command output, help).
    fn show_info(&mut self, message: &str) -> io::Result<()>;
}
