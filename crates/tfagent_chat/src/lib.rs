//! # tfagent_chat
//!
//! Model access for the Terraform agent.
//!
//! - [`ModelClient`]: the one seam every model call goes through
//! - [`LlmAdapter`]: OpenAI and Anthropic over HTTP
//! - [`ScriptedModel`]: scripted client for tests
//! - [`ChatAgent`]: plain chat fallback
//! - [`KeywordClassifier`]: routes text to generation or chat

pub mod agent;
pub mod error;
pub mod intent;
pub mod llm;
pub mod mock;
pub mod types;

pub use agent::{ChatAgent, DEFAULT_CHAT_PROMPT};
pub use error::{ChatError, ChatResult};
pub use intent::{Intent, IntentClassifier, KeywordClassifier};
pub use llm::{LlmAdapter, LlmProvider, LlmSettings, ModelClient};
pub use mock::{RecordedRequest, ScriptedModel};
pub use types::{Message, MessageRole, OutputFormat};
