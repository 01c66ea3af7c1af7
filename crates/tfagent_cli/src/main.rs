//! tfagent CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Policy or validation failure
//! - 4: Generation error (model or extraction)
//! - 5: IaC error
//! - 6: Not confirmed

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod confirm;

use commands::{Cli, Commands};
use tfagent_chat::ChatError;
use tfagent_core::CoreError;
use tfagent_iac::IacError;
use tfagent_policy::PolicyError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const GENERATION_ERROR: u8 = 4;
    pub const IAC_ERROR: u8 = 5;
    pub const NOT_CONFIRMED: u8 = 6;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "tfagent=debug"
    } else if cli.quiet {
        "tfagent=warn"
    } else {
        "tfagent=info"
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in [level, "warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // A subscriber installed earlier keeps precedence.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    let config = cli.config.clone();
    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, config).await,
        Commands::Chat(args) => commands::chat::execute(args, config).await,
        Commands::Init(args) => commands::lifecycle::init(args, config).await,
        Commands::Plan(args) => commands::lifecycle::plan(args, config).await,
        Commands::Apply(args) => commands::lifecycle::apply(args, config).await,
        Commands::Destroy(args) => commands::lifecycle::destroy(args, config).await,
        Commands::Show(args) => commands::show::execute(args, config).await,
        Commands::Audit(args) => commands::audit::execute(args, config).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<CoreError>() {
            return match err {
                CoreError::EmptyResponse
                | CoreError::NoJsonFound { .. }
                | CoreError::MalformedJson { .. }
                | CoreError::Model(_) => ExitCodes::GENERATION_ERROR,
                CoreError::MissingScope | CoreError::InvalidConfig { .. } => ExitCodes::INVALID_ARGS,
                CoreError::Iac(err) => categorize_iac(err),
                CoreError::Policy(_) => ExitCodes::VALIDATION_FAILURE,
                CoreError::Io(_) => ExitCodes::GENERAL_ERROR,
            };
        }
        if let Some(err) = cause.downcast_ref::<IacError>() {
            return categorize_iac(err);
        }
        if cause.downcast_ref::<ChatError>().is_some() {
            return ExitCodes::GENERATION_ERROR;
        }
        if cause.downcast_ref::<PolicyError>().is_some() {
            return ExitCodes::VALIDATION_FAILURE;
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("policy") || msg.contains("violation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("terraform") {
        ExitCodes::IAC_ERROR
    } else if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

fn categorize_iac(err: &IacError) -> u8 {
    match err {
        IacError::NotConfirmed { .. } | IacError::Prompt(_) => ExitCodes::NOT_CONFIRMED,
        IacError::MissingRequiredField { .. } | IacError::InvalidField { .. } | IacError::Policy(_) => {
            ExitCodes::VALIDATION_FAILURE
        }
        IacError::InvalidName { .. } | IacError::StackNotFound(_) => ExitCodes::INVALID_ARGS,
        IacError::TerraformNotAvailable(_) | IacError::Runner(_) => ExitCodes::IAC_ERROR,
        IacError::Io(_) => ExitCodes::GENERAL_ERROR,
    }
}
