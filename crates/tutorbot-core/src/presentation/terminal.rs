//! Line-oriented terminal UI.
//!
//! A terminal keeps what it has already printed, so "re-rendering" the
//! transcript only prints turns that have not been shown yet.

use std::io::{self, BufRead, Write};

use super::Presenter;
use crate::session::{Role, Transcript, Turn};

const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Presenter over any line reader and writer (usually stdin/stdout).
pub struct TerminalPresenter<R, W> {
    input: R,
    output: W,
    rendered: usize,
    color: bool,
}

impl<R: BufRead, W: Write> TerminalPresenter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            rendered: 0,
            color: true,
        }
    }

    /// Disable ANSI colors (pipes, tests, `NO_COLOR`).
    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn paint(&self, color: &'static str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn write_turn(&mut self, turn: &Turn) -> io::Result<()> {
        let (label, color) = match turn.role() {
            Role::User => ("👤 You", CYAN),
            Role::Ai => ("🤖 AI", GREEN),
        };
        let stamp = self.paint(DIM, &turn.created_at().format("%H:%M").to_string());
        let label = self.paint(color, &format!("{label}:"));
        writeln!(self.output, "  {label} {stamp}")?;
        for line in turn.content().lines() {
            writeln!(self.output, "  {line}")?;
        }
        writeln!(self.output)
    }
}

impl<R: BufRead, W: Write> Presenter for TerminalPresenter<R, W> {
    fn render(&mut self, transcript: &Transcript) -> io::Result<()> {
        if transcript.len() < self.rendered {
            // A new conversation started since the last render.
            self.rendered = 0;
            let rule = self.paint(DIM, "  ── new conversation ──");
            writeln!(self.output, "{rule}\n")?;
        }

        let pending: Vec<Turn> = transcript.iter().skip(self.rendered).cloned().collect();
        for turn in &pending {
            self.write_turn(turn)?;
        }
        self.rendered = transcript.len();
        self.output.flush()
    }

    fn next_submission(&mut self) -> io::Result<Option<String>> {
        let prompt = self.paint(CYAN, ">");
        write!(self.output, "  {prompt} ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn show_error(&mut self, message: &str) -> io::Result<()> {
        let banner = self.paint(RED, &format!("❌ Error: {message}"));
        writeln!(self.output, "  {banner}\n")?;
        self.output.flush()
    }

    fn show_warning(&mut self, message: &str) -> io::Result<()> {
        let banner = self.paint(YELLOW, &format!("⚠️  {message}"));
        writeln!(self.output, "  {banner}\n")?;
        self.output.flush()
    }

    fn show_info(&mut self, message: &str) -> io::Result<()> {
        for line in message.lines() {
            writeln!(self.output, "  {line}")?;
        }
        writeln!(self.output)?;
        self.output.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn presenter(input: &str) -> TerminalPresenter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPresenter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new()).without_color()
    }

    fn output(p: TerminalPresenter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.into_output()).unwrap()
    }

    #[test]
    fn test_render_labels_turns() {
        let mut transcript = Transcript::new();
        transcript.append_exchange("What is overfitting?", "Memorizing noise.");

        let mut p = presenter("");
        p.render(&transcript).unwrap();
        let out = output(p);

        let you = out.find("👤 You:").unwrap();
        let ai = out.find("🤖 AI:").unwrap();
        assert!(you < ai);
        assert!(out.contains("What is overfitting?"));
        assert!(out.contains("Memorizing noise."));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn test_render_only_prints_new_turns() {
        let mut transcript = Transcript::new();
        transcript.append_exchange("q1", "a1");

        let mut p = presenter("");
        p.render(&transcript).unwrap();
        transcript.append_exchange("q2", "a2");
        p.render(&transcript).unwrap();
        let out = output(p);

        assert_eq!(out.matches("q1").count(), 1);
        assert_eq!(out.matches("a2").count(), 1);
    }

    #[test]
    fn test_render_after_restart_starts_over() {
        let mut transcript = Transcript::new();
        transcript.append_exchange("q1", "a1");

        let mut p = presenter("");
        p.render(&transcript).unwrap();
        p.render(&Transcript::new()).unwrap();
        let mut fresh = Transcript::new();
        fresh.append_exchange("q2", "a2");
        p.render(&fresh).unwrap();
        let out = output(p);

        assert!(out.contains("new conversation"));
        assert!(out.contains("q2"));
    }

    #[test]
    fn test_next_submission_trims_and_detects_eof() {
        let mut p = presenter("  What is a p-value?  \n");
        assert_eq!(
            p.next_submission().unwrap().as_deref(),
            Some("What is a p-value?")
        );
        assert_eq!(p.next_submission().unwrap(), None);
    }

    #[test]
    fn test_banners_are_distinct_from_replies() {
        let mut p = presenter("");
        p.show_error("quota exceeded").unwrap();
        p.show_warning("Switched to flash").unwrap();
        let out = output(p);

        assert!(out.contains("❌ Error: quota exceeded"));
        assert!(out.contains("⚠️  Switched to flash"));
        assert!(!out.contains("🤖 AI"));
    }
}
