//! Generate command - Turn a request into a Terraform stack.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use tfagent_chat::LlmAdapter;
use tfagent_core::{AgentConfig, GenerationOutcome, GenerationRequest, Orchestrator};

#[derive(Args)]
pub struct GenerateArgs {
    /// What to build, e.g. "a storage bucket named logs-bucket, project id my-proj"
    #[arg(required = true, num_args = 1..)]
    pub request: Vec<String>,

    /// Stack name (defaults to the configured stack)
    #[arg(short, long)]
    pub stack: Option<String>,

    /// GCP project when the request does not name one
    #[arg(long, env = "TFAGENT_PROJECT_ID")]
    pub project_id: Option<String>,

    /// GCP region when the request does not name one
    #[arg(long, env = "TFAGENT_REGION")]
    pub region: Option<String>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: GenerateArgs, config: Option<PathBuf>) -> Result<()> {
    let mut config = super::load_config(config)?;
    apply_scope_flags(&mut config, &args);

    let orchestrator = orchestrator(&config)?;

    let mut request = GenerationRequest::new(args.request.join(" "));
    if let Some(stack) = &args.stack {
        request = request.with_stack(stack);
    }

    if !args.json {
        println!("🤖 Generating Terraform...");
    }

    let outcome = orchestrator
        .generate_infrastructure(&request)
        .await
        .context("Terraform generation failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(())
}

/// Flags override the configured scope; the request text still wins over both.
pub(crate) fn apply_scope_flags(config: &mut AgentConfig, args: &GenerateArgs) {
    if let Some(project) = &args.project_id {
        config.scope.project_id = Some(project.clone());
    }
    if let Some(region) = &args.region {
        config.scope.region = Some(region.clone());
    }
}

pub(crate) fn orchestrator(config: &AgentConfig) -> Result<Orchestrator> {
    let client = LlmAdapter::from_settings(&config.llm).context("Model client is not configured")?;
    info!("Using {:?} model {}", client.provider(), client.model());
    Ok(Orchestrator::from_config(config, Arc::new(client))?)
}

pub(crate) fn print_outcome(outcome: &GenerationOutcome) {
    println!(
        "✅ Stack '{}' generated at {}",
        outcome.stack_name,
        outcome.workspace.display()
    );
    println!(
        "   Project: {}  Region: {}",
        outcome.scope.project_id, outcome.scope.region
    );

    println!("   Files:");
    for file in &outcome.report.written {
        println!("      - {}", file.display());
    }
    if !outcome.report.skipped.is_empty() {
        println!("   ⚠️  Skipped:");
        for file in &outcome.report.skipped {
            println!("      - {}", file.display());
        }
    }
    if outcome.report.dropped_lines > 0 {
        println!(
            "   🔒 {} line(s) removed by the ownership policy",
            outcome.report.dropped_lines
        );
    }
    for violation in &outcome.violations {
        println!(
            "   ⚠️  {} ({})",
            violation.message,
            violation.file.as_deref().unwrap_or("?")
        );
    }

    println!();
    println!("Next: tfagent init {0} && tfagent plan {0}", outcome.stack_name);
}
