//! Error types for the core module.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while generating infrastructure.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("No JSON object found in model response")]
    NoJsonFound { raw: String },

    #[error("Model response is not valid JSON: {source}")]
    MalformedJson {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No GCP project id: mention 'project id <id>' in the request, or set scope.project_id / TFAGENT_PROJECT_ID / GOOGLE_CLOUD_PROJECT")]
    MissingScope,

    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("Model error: {0}")]
    Model(#[from] tfagent_chat::ChatError),

    #[error("IaC error: {0}")]
    Iac(#[from] tfagent_iac::IacError),

    #[error("Policy error: {0}")]
    Policy(#[from] tfagent_policy::PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Raw model text attached to an extraction failure.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            CoreError::NoJsonFound { raw } | CoreError::MalformedJson { raw, .. } => Some(raw.as_str()),
            _ => None,
        }
    }
}
