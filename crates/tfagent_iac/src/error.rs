//! Error types for IaC module.

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur during IaC operations.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Terraform not available: {0}")]
    TerraformNotAvailable(String),

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Generated document is missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("Generated document has invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Terraform {command} not confirmed for stack '{stack}'")]
    NotConfirmed { command: String, stack: String },

    #[error("Confirmation prompt failed: {0}")]
    Prompt(String),

    #[error("Runner error: {0}")]
    Runner(#[from] tfagent_runner::RunnerError),

    #[error("Policy error: {0}")]
    Policy(#[from] tfagent_policy::PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
