//! Audit command - Check a stack against the ownership policy.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use tfagent_iac::{IacError, StackWorkspace};
use tfagent_policy::{RuleSeverity, WorkspaceAudit};

#[derive(Args)]
pub struct AuditArgs {
    /// Stack to audit (defaults to the configured stack)
    pub stack: Option<String>,

    /// Print findings as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: AuditArgs, config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let name = args.stack.unwrap_or_else(|| config.paths.default_stack.clone());
    let workspace = config.layout().stack(&name)?;
    if !workspace.exists() {
        return Err(IacError::StackNotFound(workspace.root().display().to_string()).into());
    }

    info!("Auditing stack '{}'", name);
    let policy = config.policy.resolve()?;
    let violations = WorkspaceAudit::new(policy)
        .with_system_owned(StackWorkspace::system_owned_files())
        .run(workspace.root())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&violations)?);
    } else if violations.is_empty() {
        println!("✅ Stack '{}' respects the ownership policy", name);
    } else {
        println!("🔒 Stack '{}':", name);
        for violation in &violations {
            let marker = match violation.severity {
                RuleSeverity::Error => "❌",
                RuleSeverity::Warning => "⚠️ ",
                RuleSeverity::Info => "ℹ️ ",
            };
            println!(
                "   {} [{}] {} ({}:{})",
                marker,
                violation.rule_id,
                violation.message,
                violation.file.as_deref().unwrap_or("?"),
                violation.line.unwrap_or(0)
            );
        }
    }

    let errors = violations
        .iter()
        .filter(|v| v.severity == RuleSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("{} policy violation(s) found in stack '{}'", errors, name);
    }

    Ok(())
}
