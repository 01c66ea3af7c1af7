//! Error types for the chat system.

use std::fmt;

/// Chat and model client errors
#[derive(Debug)]
pub enum ChatError {
    /// No API key was found for any supported provider
    LlmNotConfigured,
    /// Unknown provider name in configuration
    UnknownProvider(String),
    /// LLM request failed
    LlmError(String),
    /// The model answered with no content
    EmptyCompletion,
    /// Serialization error
    SerializationError(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LlmNotConfigured => write!(
                f,
                "LLM not configured. Set OPENAI_API_KEY or ANTHROPIC_API_KEY"
            ),
            Self::UnknownProvider(name) => write!(
                f,
                "Unknown LLM provider '{}' (expected 'openai' or 'anthropic')",
                name
            ),
            Self::LlmError(msg) => write!(f, "LLM error: {}", msg),
            Self::EmptyCompletion => write!(f, "LLM returned an empty completion"),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
