//! Show command - Print the generated files of a stack.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

#[derive(Args)]
pub struct ShowArgs {
    /// Stack to show (defaults to the configured stack)
    pub stack: Option<String>,

    /// Only list existing stacks
    #[arg(short, long)]
    pub list: bool,

    /// Print file names without contents
    #[arg(long)]
    pub names_only: bool,
}

pub async fn execute(args: ShowArgs, config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let layout = config.layout();

    if args.list {
        let stacks = layout.list_stacks()?;
        if stacks.is_empty() {
            println!("No stacks under {}", layout.stacks_dir().display());
        }
        for stack in stacks {
            println!("{}", stack);
        }
        return Ok(());
    }

    let name = args.stack.unwrap_or(config.paths.default_stack);
    let workspace = layout.stack(&name)?;
    let files = workspace.list_files()?;

    println!("📁 {} ({} files)", workspace.root().display(), files.len());
    for file in files {
        if args.names_only {
            println!("   {}", file.display());
            continue;
        }
        let content = std::fs::read_to_string(workspace.root().join(&file))
            .with_context(|| format!("Failed to read {}", file.display()))?;
        println!();
        println!("── {} ──", file.display());
        println!("{}", content.trim_end());
    }

    Ok(())
}
