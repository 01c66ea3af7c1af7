//! CLI command definitions.
//!
//! Each subcommand maps to one step of the generate → review → provision
//! workflow.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use tfagent_core::AgentConfig;

pub mod audit;
pub mod chat;
pub mod generate;
pub mod lifecycle;
pub mod show;

/// tfagent - natural-language Terraform generation for Google Cloud
#[derive(Parser)]
#[command(name = "tfagent")]
#[command(version, about = "tfagent - natural-language Terraform generation for Google Cloud")]
#[command(long_about = r#"
tfagent turns an infrastructure request written in plain language into a
policy-constrained Terraform stack, then runs the Terraform lifecycle against
it behind explicit confirmations.

The model never decides which project or region a stack targets: those are
written by tfagent into providers.tf, variables.tf and terraform.tfvars, and
stripped from everything the model produced.

WORKFLOWS:
  generate  → Generate a stack from a request
  chat      → Interactive session (infrastructure requests or questions)
  init      → terraform init
  plan      → terraform plan (saved to the runs directory)
  apply     → terraform apply (asks for confirmation)
  destroy   → terraform destroy (asks for confirmation and a typed phrase)
  show      → Print the generated files of a stack
  audit     → Check a stack against the ownership policy

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Policy or validation failure
  4 - Generation error (model or extraction)
  5 - IaC error
  6 - Not confirmed

ENVIRONMENT:
  OPENAI_API_KEY / ANTHROPIC_API_KEY   model credentials
  TFAGENT_PROJECT_ID / TFAGENT_REGION  default scope
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./tfagent.toml when present)
    #[arg(short, long, global = true, env = "TFAGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a Terraform stack from a natural-language request
    Generate(generate::GenerateArgs),

    /// Start an interactive session
    Chat(chat::ChatArgs),

    /// Run terraform init for a stack
    Init(lifecycle::LifecycleArgs),

    /// Run terraform plan for a stack
    Plan(lifecycle::LifecycleArgs),

    /// Run terraform apply for a stack
    Apply(lifecycle::LifecycleArgs),

    /// Run terraform destroy for a stack
    Destroy(lifecycle::LifecycleArgs),

    /// Show the generated files of a stack
    Show(show::ShowArgs),

    /// Audit a stack against the ownership policy
    Audit(audit::AuditArgs),
}

/// Load the agent configuration for a command.
pub fn load_config(path: Option<PathBuf>) -> Result<AgentConfig> {
    Ok(AgentConfig::load(path.as_deref())?)
}
