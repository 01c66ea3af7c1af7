//! Lifecycle commands - terraform init, plan, apply and destroy.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use parking_lot::Mutex;
use tracing::info;

use tfagent_core::AgentConfig;
use tfagent_iac::{Confirmer, LifecycleCommand, LifecycleGate, TerraformResult, TerraformRunner};
use tfagent_runner::{LogHandler, LogLine, ProcessRunner, ProcessRunnerOptions};

use crate::confirm::{AssumeYes, TerminalConfirmer};

#[derive(Args)]
pub struct LifecycleArgs {
    /// Stack to operate on (defaults to the configured stack)
    pub stack: Option<String>,

    /// Answer yes to the confirmation prompt (the destroy phrase must still be typed)
    #[arg(short, long)]
    pub yes: bool,

    /// Print the terraform command instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// Only print terraform output when the command fails
    #[arg(long)]
    pub no_stream: bool,
}

pub async fn init(args: LifecycleArgs, config: Option<PathBuf>) -> Result<()> {
    execute(LifecycleCommand::Init, args, config).await
}

pub async fn plan(args: LifecycleArgs, config: Option<PathBuf>) -> Result<()> {
    execute(LifecycleCommand::Plan, args, config).await
}

pub async fn apply(args: LifecycleArgs, config: Option<PathBuf>) -> Result<()> {
    execute(LifecycleCommand::Apply, args, config).await
}

pub async fn destroy(args: LifecycleArgs, config: Option<PathBuf>) -> Result<()> {
    execute(LifecycleCommand::Destroy, args, config).await
}

async fn execute(command: LifecycleCommand, args: LifecycleArgs, config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let stack = args
        .stack
        .clone()
        .unwrap_or_else(|| config.paths.default_stack.clone());

    println!("🔧 terraform {} → stack '{}'", command, stack);
    if args.dry_run {
        println!("   (dry run: nothing will be executed)");
    }

    let errors = Arc::new(Mutex::new(Vec::new()));
    let runner = terraform_runner(&config, &args, error_collector(errors.clone()));
    let outcome = if args.yes {
        run_gated(runner, AssumeYes::new(TerminalConfirmer), command, &stack).await
    } else {
        run_gated(runner, TerminalConfirmer, command, &stack).await
    };
    let result =
        outcome.with_context(|| format!("terraform {} could not run for stack '{}'", command, stack))?;

    let errors = errors.lock().clone();
    report(&result, &args, &errors)
}

/// Keeps the `Error:` lines Terraform prints so a failure can be summarized.
fn error_collector(sink: Arc<Mutex<Vec<String>>>) -> LogHandler {
    Arc::new(move |line: LogLine| {
        if is_error_line(&line.message) {
            sink.lock().push(line.message.trim().to_string());
        }
    })
}

fn is_error_line(line: &str) -> bool {
    line.trim_start().trim_start_matches('│').trim_start().starts_with("Error:")
}

fn terraform_runner(config: &AgentConfig, args: &LifecycleArgs, log_handler: LogHandler) -> TerraformRunner {
    let mut options = ProcessRunnerOptions::new();
    if args.dry_run {
        options = options.dry_run();
    }
    let process = ProcessRunner::new(options).with_log_handler(log_handler);
    let cleanup = !process.is_dry_run();

    TerraformRunner::new(Arc::new(process), config.layout())
        .with_binary(&config.terraform.binary)
        .with_timeout(config.terraform.timeout_seconds)
        .with_streaming(!args.no_stream)
        .with_local_cleanup(cleanup)
}

async fn run_gated<C: Confirmer>(
    runner: TerraformRunner,
    confirmer: C,
    command: LifecycleCommand,
    stack: &str,
) -> tfagent_iac::IacResult<TerraformResult> {
    LifecycleGate::new(runner, confirmer).execute(command, stack).await
}

fn report(result: &TerraformResult, args: &LifecycleArgs, errors: &[String]) -> Result<()> {
    if result.success {
        if args.no_stream || args.dry_run {
            println!("{}", result.output.trim_end());
        } else if let Some(note) = result.output.lines().last().filter(|l| l.starts_with("Local Terraform stack")) {
            println!("{}", note);
        }
        info!("terraform {} finished for '{}'", result.command, result.stack);
        println!("✅ terraform {} succeeded for '{}'", result.command, result.stack);
        Ok(())
    } else {
        if args.no_stream {
            eprintln!("{}", result.output.trim_end());
        } else if !errors.is_empty() {
            eprintln!();
            for error in errors {
                eprintln!("   {}", error);
            }
        }
        anyhow::bail!(
            "terraform {} failed for stack '{}' (exit code {})",
            result.command,
            result.stack,
            result.exit_code
        )
    }
}
