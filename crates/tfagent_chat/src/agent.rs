//! Plain chat fallback for requests that are not about infrastructure.

use std::sync::Arc;

use tracing::debug;

use crate::error::ChatResult;
use crate::llm::ModelClient;
use crate::types::OutputFormat;

pub const DEFAULT_CHAT_PROMPT: &str = "You are a helpful assistant.";

/// Single-turn chat with a fixed system prompt.
pub struct ChatAgent {
    client: Arc<dyn ModelClient>,
    system_prompt: String,
}

impl ChatAgent {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            system_prompt: DEFAULT_CHAT_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Answer one prompt. The reply is trimmed.
    pub async fn run(&self, prompt: &str) -> ChatResult<String> {
        debug!("Chat fallback for {} character prompt", prompt.len());
        let reply = self
            .client
            .invoke(&self.system_prompt, prompt, OutputFormat::Text)
            .await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedModel;

    #[tokio::test]
    async fn test_chat_agent_trims_reply() {
        let model = ScriptedModel::new().reply("  Hello there!\n");
        let agent = ChatAgent::new(Arc::new(model.clone()));

        assert_eq!(agent.run("hi").await.unwrap(), "Hello there!");
        let request = &model.requests()[0];
        assert_eq!(request.system_prompt(), Some(DEFAULT_CHAT_PROMPT));
        assert_eq!(request.format, OutputFormat::Text);
    }

    #[tokio::test]
    async fn test_custom_system_prompt() {
        let model = ScriptedModel::new().reply("ok");
        let agent = ChatAgent::new(Arc::new(model.clone())).with_system_prompt("Be brief.");

        agent.run("hi").await.unwrap();
        assert_eq!(model.requests()[0].system_prompt(), Some("Be brief."));
    }
}
