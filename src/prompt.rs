//! Yes/no questions for the user.

use anyhow::{Context, Result};
use inquire::Confirm;

/// Something that can answer a yes/no question.
pub trait Prompter {
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;
}

/// Asks on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        Confirm::new(question)
            .with_default(default)
            .prompt()
            .context("Failed to read answer from terminal")
    }
}

/// Always gives the same answer, without a terminal.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompter for FixedAnswer {
    fn confirm(&self, question: &str, _default: bool) -> Result<bool> {
        tracing::debug!(question, answer = self.0, "answering prompt");
        Ok(self.0)
    }
}
