//! Blocking operator prompts.

use anyhow::{Context, Result};

/// A synchronous confirmation step.
///
/// `pause` returns only once the operator has acknowledged the message. Nothing
/// else in the invocation runs while it is pending.
pub trait Prompter: Send + Sync {
    fn pause(&self, message: &str) -> Result<()>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn pause(&self, message: &str) -> Result<()> {
        dialoguer::Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()
            .context("failed to read confirmation from the terminal")?;
        Ok(())
    }
}
