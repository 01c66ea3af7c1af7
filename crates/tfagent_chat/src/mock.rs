//! Scripted model client for testing.
//!
//! Returns queued replies in order and records every request, so tests can
//! drive the orchestrator without a network.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{ChatError, ChatResult};
use crate::llm::ModelClient;
use crate::types::{Message, OutputFormat};

/// A request seen by [`ScriptedModel`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub format: OutputFormat,
}

impl RecordedRequest {
    /// Content of the first system message, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == crate::types::MessageRole::System)
            .map(|m| m.content.as_str())
    }

    /// Content of the last user message, if any.
    pub fn user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::types::MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Failure(String),
}

/// Model client that answers from a script.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    replies: Arc<RwLock<VecDeque<Reply>>>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.write().push_back(Reply::Text(text.into()));
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies.write().push_back(Reply::Failure(message.into()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, messages: &[Message], format: OutputFormat) -> ChatResult<String> {
        self.requests.write().push(RecordedRequest {
            messages: messages.to_vec(),
            format,
        });

        match self.replies.write().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Failure(message)) => Err(ChatError::LlmError(message)),
            None => Err(ChatError::LlmError("no scripted reply left".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order() {
        let model = ScriptedModel::new().reply("first").fail("boom").reply("third");

        assert_eq!(model.invoke("sys", "a", OutputFormat::Text).await.unwrap(), "first");
        assert!(model.invoke("sys", "b", OutputFormat::Text).await.is_err());
        assert_eq!(model.invoke("sys", "c", OutputFormat::Json).await.unwrap(), "third");
        assert!(model.invoke("sys", "d", OutputFormat::Text).await.is_err());

        let requests = model.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[2].system_prompt(), Some("sys"));
        assert_eq!(requests[2].user_prompt(), Some("c"));
        assert_eq!(requests[2].format, OutputFormat::Json);
    }
}
