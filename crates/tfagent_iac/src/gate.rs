//! Human confirmation in front of resource-changing commands.
//!
//! `apply` needs one yes/no confirmation. `destroy` needs the yes/no
//! confirmation and the typed phrase [`DESTROY_PHRASE`]. `init` and `plan`
//! pass straight through.

use tracing::{info, warn};

use crate::error::{IacError, IacResult};
use crate::terraform::{LifecycleCommand, TerraformResult, TerraformRunner};

/// Phrase that must be typed before a destroy runs.
pub const DESTROY_PHRASE: &str = "DESTROY";

/// Source of human confirmations.
#[cfg_attr(test, mockall::automock)]
pub trait Confirmer: Send + Sync {
    /// Ask a yes/no question.
    fn confirm(&self, prompt: &str) -> IacResult<bool>;

    /// Ask the user to type `phrase` exactly.
    fn confirm_phrase(&self, prompt: &str, phrase: &str) -> IacResult<bool>;
}

/// Confirmer for runs without a terminal.
///
/// Yes/no questions get a fixed answer. Phrases are never confirmed, so a
/// destroy always needs an interactive session.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive {
    approve: bool,
}

impl NonInteractive {
    pub fn new(approve: bool) -> Self {
        Self { approve }
    }
}

impl Confirmer for NonInteractive {
    fn confirm(&self, prompt: &str) -> IacResult<bool> {
        info!("{} -> {}", prompt, if self.approve { "yes (pre-approved)" } else { "no" });
        Ok(self.approve)
    }

    fn confirm_phrase(&self, prompt: &str, _phrase: &str) -> IacResult<bool> {
        warn!("{} -> cannot be answered non-interactively", prompt);
        Ok(false)
    }
}

/// [`TerraformRunner`] with confirmations in front of `apply` and `destroy`.
pub struct LifecycleGate<C: Confirmer> {
    runner: TerraformRunner,
    confirmer: C,
}

impl<C: Confirmer> LifecycleGate<C> {
    pub fn new(runner: TerraformRunner, confirmer: C) -> Self {
        Self { runner, confirmer }
    }

    pub fn runner(&self) -> &TerraformRunner {
        &self.runner
    }

    /// Run `command` once every required confirmation is given.
    ///
    /// A refused confirmation returns [`IacError::NotConfirmed`] and nothing
    /// is executed.
    pub async fn execute(&self, command: LifecycleCommand, stack: &str) -> IacResult<TerraformResult> {
        if !self.confirmed(command, stack)? {
            info!("terraform {} for '{}' cancelled", command, stack);
            return Err(IacError::NotConfirmed {
                command: command.to_string(),
                stack: stack.to_string(),
            });
        }
        self.runner.run(command, stack).await
    }

    fn confirmed(&self, command: LifecycleCommand, stack: &str) -> IacResult<bool> {
        match command {
            LifecycleCommand::Init | LifecycleCommand::Plan => Ok(true),
            LifecycleCommand::Apply => self.confirmer.confirm(&format!(
                "This will CREATE or CHANGE real resources in your GCP project for stack '{}'. Continue?",
                stack
            )),
            LifecycleCommand::Destroy => {
                let agreed = self.confirmer.confirm(&format!(
                    "This will DESTROY all resources created by stack '{}'. Continue?",
                    stack
                ))?;
                if !agreed {
                    return Ok(false);
                }
                self.confirmer.confirm_phrase(
                    &format!("Type {} to confirm destruction of '{}'", DESTROY_PHRASE, stack),
                    DESTROY_PHRASE,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mockall::predicate::*;
    use tempfile::tempdir;
    use tfagent_runner::{MockResponse, MockRunner};

    use crate::workspace::WorkspaceLayout;

    fn setup(mock: MockRunner) -> (tempfile::TempDir, TerraformRunner) {
        let temp = tempdir().unwrap();
        let layout = WorkspaceLayout::new(temp.path().join("stacks"), temp.path().join("runs"));
        layout.stack("demo").unwrap().ensure_dirs().unwrap();
        let runner = TerraformRunner::new(Arc::new(mock), layout);
        (temp, runner)
    }

    #[tokio::test]
    async fn test_plan_needs_no_confirmation() {
        let mock = MockRunner::new().add_response(MockResponse::success("No changes."));
        let (_temp, runner) = setup(mock.clone());

        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().never();
        confirmer.expect_confirm_phrase().never();

        let gate = LifecycleGate::new(runner, confirmer);
        let result = gate.execute(LifecycleCommand::Plan, "demo").await.unwrap();
        assert!(result.success);
        assert_eq!(mock.runs().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_declined_runs_nothing() {
        let mock = MockRunner::new();
        let (_temp, runner) = setup(mock.clone());

        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().times(1).returning(|_| Ok(false));

        let gate = LifecycleGate::new(runner, confirmer);
        let err = gate.execute(LifecycleCommand::Apply, "demo").await.unwrap_err();
        assert!(matches!(err, IacError::NotConfirmed { .. }));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_destroy_requires_phrase() {
        let mock = MockRunner::new();
        let (temp, runner) = setup(mock.clone());

        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().times(1).returning(|_| Ok(true));
        confirmer
            .expect_confirm_phrase()
            .with(always(), eq(DESTROY_PHRASE))
            .times(1)
            .returning(|_, _| Ok(false));

        let gate = LifecycleGate::new(runner, confirmer);
        let err = gate.execute(LifecycleCommand::Destroy, "demo").await.unwrap_err();
        assert!(matches!(err, IacError::NotConfirmed { .. }));
        assert_eq!(mock.call_count(), 0);
        assert!(temp.path().join("stacks").join("demo").exists());
    }

    #[tokio::test]
    async fn test_destroy_confirmed_runs_and_cleans_up() {
        let mock = MockRunner::new().add_response(MockResponse::success("Destroy complete!"));
        let (temp, runner) = setup(mock.clone());

        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().returning(|_| Ok(true));
        confirmer.expect_confirm_phrase().returning(|_, _| Ok(true));

        let gate = LifecycleGate::new(runner, confirmer);
        let result = gate.execute(LifecycleCommand::Destroy, "demo").await.unwrap();

        assert!(result.success);
        assert!(!temp.path().join("stacks").join("demo").exists());
        let calls = mock.runs();
        assert_eq!(calls[0].args, vec!["destroy", "-no-color", "-input=false", "-auto-approve"]);
    }

    #[tokio::test]
    async fn test_non_interactive_never_destroys() {
        let mock = MockRunner::new();
        let (_temp, runner) = setup(mock.clone());

        let gate = LifecycleGate::new(runner, NonInteractive::new(true));
        let err = gate.execute(LifecycleCommand::Destroy, "demo").await.unwrap_err();
        assert!(matches!(err, IacError::NotConfirmed { .. }));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_interactive_apply() {
        let mock = MockRunner::new().add_response(MockResponse::success("Apply complete!"));
        let (_temp, runner) = setup(mock.clone());

        let gate = LifecycleGate::new(runner, NonInteractive::new(true));
        assert!(gate.execute(LifecycleCommand::Apply, "demo").await.unwrap().success);

        let gate = LifecycleGate::new(gate.runner, NonInteractive::default());
        assert!(gate.execute(LifecycleCommand::Apply, "demo").await.is_err());
    }
}
