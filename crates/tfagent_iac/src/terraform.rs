//! Terraform lifecycle runner.
//!
//! Runs `terraform init | plan | apply | destroy` inside a stack directory
//! through a [`CommandRunner`]. Confirmation is not handled here; see
//! [`crate::gate::LifecycleGate`].

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use tfagent_runner::{CommandRunner, CommandSpec, RunConfig};

use crate::error::{IacError, IacResult};
use crate::workspace::{StackWorkspace, WorkspaceLayout};

/// Terraform subcommands the agent drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleCommand {
    Init,
    Plan,
    Apply,
    Destroy,
}

impl LifecycleCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleCommand::Init => "init",
            LifecycleCommand::Plan => "plan",
            LifecycleCommand::Apply => "apply",
            LifecycleCommand::Destroy => "destroy",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            LifecycleCommand::Init,
            LifecycleCommand::Plan,
            LifecycleCommand::Apply,
            LifecycleCommand::Destroy,
        ]
    }

    /// Whether the command changes real cloud resources.
    pub fn mutates_resources(&self) -> bool {
        matches!(self, LifecycleCommand::Apply | LifecycleCommand::Destroy)
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LifecycleCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "init" => Ok(LifecycleCommand::Init),
            "plan" => Ok(LifecycleCommand::Plan),
            "apply" => Ok(LifecycleCommand::Apply),
            "destroy" => Ok(LifecycleCommand::Destroy),
            other => Err(format!("unknown terraform command '{}'", other)),
        }
    }
}

/// Result of a Terraform operation.
#[derive(Debug, Clone, Serialize)]
pub struct TerraformResult {
    pub command: LifecycleCommand,
    pub stack: String,
    pub success: bool,
    pub exit_code: i64,
    /// Combined stdout and stderr
    pub output: String,
}

/// Drives the Terraform CLI for stacks under a [`WorkspaceLayout`].
pub struct TerraformRunner {
    runner: Arc<dyn CommandRunner>,
    layout: WorkspaceLayout,
    binary: String,
    timeout_seconds: u64,
    stream_logs: bool,
    local_cleanup: bool,
}

impl TerraformRunner {
    pub fn new(runner: Arc<dyn CommandRunner>, layout: WorkspaceLayout) -> Self {
        Self {
            runner,
            layout,
            binary: "terraform".to_string(),
            timeout_seconds: 0,
            stream_logs: false,
            local_cleanup: true,
        }
    }

    /// Use a different Terraform executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Timeout per command in seconds (0 = none).
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.stream_logs = enabled;
        self
    }

    /// Whether a successful destroy deletes the local stack and plan.
    pub fn with_local_cleanup(mut self, enabled: bool) -> Self {
        self.local_cleanup = enabled;
        self
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Fail with [`IacError::TerraformNotAvailable`] unless the binary runs.
    pub async fn ensure_available(&self) -> IacResult<()> {
        if self.runner.is_available(&self.binary).await? {
            Ok(())
        } else {
            Err(IacError::TerraformNotAvailable(format!(
                "'{}' was not found on PATH or did not run",
                self.binary
            )))
        }
    }

    pub async fn init(&self, stack: &str) -> IacResult<TerraformResult> {
        self.run(LifecycleCommand::Init, stack).await
    }

    pub async fn plan(&self, stack: &str) -> IacResult<TerraformResult> {
        self.run(LifecycleCommand::Plan, stack).await
    }

    pub async fn apply(&self, stack: &str) -> IacResult<TerraformResult> {
        self.run(LifecycleCommand::Apply, stack).await
    }

    pub async fn destroy(&self, stack: &str) -> IacResult<TerraformResult> {
        self.run(LifecycleCommand::Destroy, stack).await
    }

    /// Run one lifecycle command against an existing stack.
    ///
    /// A non-zero exit is reported through [`TerraformResult::success`], not
    /// as an error.
    pub async fn run(&self, command: LifecycleCommand, stack: &str) -> IacResult<TerraformResult> {
        let workspace = self.existing_stack(stack)?;
        self.ensure_available().await?;

        info!("Running terraform {} for stack '{}'", command, stack);

        let args = self.command_args(command, stack)?;
        let mut result = self.execute(command, &workspace, args).await?;

        if result.success {
            match command {
                LifecycleCommand::Apply => self.discard_plan(stack),
                LifecycleCommand::Destroy if self.local_cleanup => {
                    self.discard_plan(stack);
                    workspace.remove()?;
                    result
                        .output
                        .push_str(&format!("\nLocal Terraform stack '{}' removed.", stack));
                }
                _ => {}
            }
        } else {
            warn!("terraform {} exited with code {}", command, result.exit_code);
        }

        Ok(result)
    }

    fn existing_stack(&self, stack: &str) -> IacResult<StackWorkspace> {
        let workspace = self.layout.stack(stack)?;
        if !workspace.exists() {
            return Err(IacError::StackNotFound(workspace.root().display().to_string()));
        }
        Ok(workspace)
    }

    fn command_args(&self, command: LifecycleCommand, stack: &str) -> IacResult<Vec<String>> {
        let mut args = vec![command.as_str().to_string(), "-no-color".to_string()];

        match command {
            LifecycleCommand::Init => {
                args.push("-input=false".to_string());
            }
            LifecycleCommand::Plan => {
                args.push("-input=false".to_string());
                args.push("-out".to_string());
                args.push(self.plan_path(stack)?.display().to_string());
            }
            LifecycleCommand::Apply => {
                args.push("-input=false".to_string());
                let plan = self.layout.plan_file(stack);
                if plan.is_file() {
                    args.push(fs::canonicalize(&plan)?.display().to_string());
                } else {
                    debug!("No saved plan for '{}', applying current configuration", stack);
                    args.push("-auto-approve".to_string());
                }
            }
            LifecycleCommand::Destroy => {
                args.push("-input=false".to_string());
                args.push("-auto-approve".to_string());
            }
        }

        Ok(args)
    }

    /// Absolute plan path; Terraform runs with the stack as its cwd.
    fn plan_path(&self, stack: &str) -> IacResult<PathBuf> {
        let runs_dir = self.layout.ensure_runs_dir()?;
        Ok(runs_dir.join(format!("{}.tfplan", stack)))
    }

    fn discard_plan(&self, stack: &str) {
        let plan = self.layout.plan_file(stack);
        if plan.exists() {
            if let Err(e) = fs::remove_file(&plan) {
                warn!("Could not remove plan file {}: {}", plan.display(), e);
            } else {
                debug!("Removed plan file {}", plan.display());
            }
        }
    }

    async fn execute(
        &self,
        command: LifecycleCommand,
        workspace: &StackWorkspace,
        args: Vec<String>,
    ) -> IacResult<TerraformResult> {
        let spec = CommandSpec::new(&self.binary)
            .args(args)
            .workdir(workspace.root())
            .env("TF_IN_AUTOMATION", "1");

        let run_config = RunConfig::default()
            .timeout(self.timeout_seconds)
            .stream_logs(self.stream_logs);

        debug!("Executing {}", spec.display());
        let result = self.runner.run(&spec, &run_config).await?;

        Ok(TerraformResult {
            command,
            stack: workspace.name().to_string(),
            success: result.success(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}
