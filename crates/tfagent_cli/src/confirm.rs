//! Terminal confirmations for lifecycle commands.

use dialoguer::{Confirm, Input};

use tfagent_iac::{Confirmer, IacError, IacResult};

/// Asks on the terminal.
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, prompt: &str) -> IacResult<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| IacError::Prompt(e.to_string()))
    }

    fn confirm_phrase(&self, prompt: &str, phrase: &str) -> IacResult<bool> {
        let answer: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| IacError::Prompt(e.to_string()))?;
        Ok(answer.trim() == phrase)
    }
}

/// Answers yes/no questions with yes and defers typed phrases to `inner`.
pub struct AssumeYes<C> {
    inner: C,
}

impl<C: Confirmer> AssumeYes<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: Confirmer> Confirmer for AssumeYes<C> {
    fn confirm(&self, prompt: &str) -> IacResult<bool> {
        println!("{} [--yes]", prompt);
        Ok(true)
    }

    fn confirm_phrase(&self, prompt: &str, phrase: &str) -> IacResult<bool> {
        self.inner.confirm_phrase(prompt, phrase)
    }
}
