//! Interactive chat loop tying a session to a presenter.

use std::io;
use tracing::debug;

use crate::presentation::Presenter;
use crate::session::{ConversationSession, SubmitOutcome};

const HELP: &str = "Commands:\n\
    /new    start a new conversation\n\
    /model  show the model answering your questions\n\
    /help   show this help\n\
    /quit   leave the tutor";

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatSummary {
    pub exchanges: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Quit,
    New,
    Model,
    Help,
    Unknown(String),
}

fn parse_command(input: &str) -> Option<Command> {
    let cmd = input.strip_prefix('/')?;
    Some(match cmd.trim() {
        "quit" | "exit" | "q" => Command::Quit,
        "new" | "clear" => Command::New,
        "model" => Command::Model,
        "help" | "?" => Command::Help,
        other => Command::Unknown(other.to_string()),
    })
}

/// Run the conversation until the user quits or input closes.
///
/// Model failures are shown as error banners and never end the loop.
pub async fn run_chat<P: Presenter>(
    session: &mut ConversationSession,
    presenter: &mut P,
) -> io::Result<ChatSummary> {
    let mut summary = ChatSummary::default();
    presenter.render(session.transcript())?;

    while let Some(input) = presenter.next_submission()? {
        if let Some(command) = parse_command(&input) {
            debug!(?command, "Chat command");
            match command {
                Command::Quit => break,
                Command::New => {
                    session.restart();
                    presenter.render(session.transcript())?;
                    presenter.show_info("Started a new conversation.")?;
                }
                Command::Model => presenter.show_info(&describe_model(session))?,
                Command::Help => presenter.show_info(HELP)?,
                Command::Unknown(name) => {
                    presenter.show_warning(&format!("Unknown command '/{name}'. Type /help."))?
                }
            }
            continue;
        }

        match session.submit(&input).await {
            Ok(SubmitOutcome::Ignored) => {}
            Ok(SubmitOutcome::Answered { fallback, .. }) => {
                summary.exchanges += 1;
                if let Some(fb) = fallback {
                    presenter.show_warning(&format!(
                        "{} is over quota ({}). Switched to {}.",
                        fb.from, fb.reason, fb.to
                    ))?;
                }
                presenter.render(session.transcript())?;
            }
            Err(error) => {
                summary.failures += 1;
                presenter.show_error(&error.to_string())?;
            }
        }
    }

    Ok(summary)
}

fn describe_model(session: &ConversationSession) -> String {
    let selector = session.selector();
    let active = selector.active().map(|h| h.index());
    selector
        .candidates()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let marker = if Some(i) == active { "●" } else { "○" };
            format!("{marker} {} via {} ({})", c.model, c.provider, c.endpoint)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
