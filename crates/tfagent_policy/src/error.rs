//! Policy errors.

use std::path::PathBuf;

use thiserror::Error;

pub type PolicyResult<T> = Result<T, PolicyError>;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Invalid ownership policy: {0}")]
    InvalidPolicy(String),

    #[error("Block keyword '{keyword}' cannot be matched: {reason}")]
    UnusableKeyword { keyword: String, reason: String },

    #[error("Policy file {path} is not valid YAML: {source}")]
    PolicyFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
