//! LLM adapter for chat completions.
//!
//! Supports OpenAI and Anthropic APIs. The API key is read from the
//! environment only; everything else comes from [`LlmSettings`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};
use crate::types::{Message, MessageRole, OutputFormat};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const JSON_INSTRUCTION: &str =
    "Respond with a single valid JSON object only. Do not add prose or markdown fences.";

/// Anything that can turn prompts into model text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Complete a conversation.
    async fn complete(&self, messages: &[Message], format: OutputFormat) -> ChatResult<String>;

    /// Single system + user exchange.
    async fn invoke(&self, system_prompt: &str, user_prompt: &str, format: OutputFormat) -> ChatResult<String> {
        let messages = [Message::system(system_prompt), Message::user(user_prompt)];
        self.complete(&messages, format).await
    }
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    pub fn from_name(name: &str) -> ChatResult<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAI),
            "anthropic" => Ok(LlmProvider::Anthropic),
            other => Err(ChatError::UnknownProvider(other.to_string())),
        }
    }

    fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Anthropic => "claude-sonnet-4-5",
        }
    }
}

/// Model settings from the agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// `openai` or `anthropic`; detected from the available key when unset
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    /// Attempts per request, transient failures only
    pub max_retries: u32,
    /// Override of the provider endpoint
    pub api_base: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            temperature: 0.1,
            max_tokens: 3000,
            timeout_seconds: 120,
            max_retries: 3,
            api_base: None,
        }
    }
}

/// LLM adapter that handles API calls
pub struct LlmAdapter {
    provider: LlmProvider,
    api_key: String,
    model: String,
    settings: LlmSettings,
    client: reqwest::Client,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: LlmProvider, api_key: String, settings: LlmSettings) -> ChatResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds.max(1)))
            .build()
            .map_err(|e| ChatError::LlmError(format!("Failed to build HTTP client: {}", e)))?;

        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(Self {
            provider,
            api_key,
            model,
            settings,
            client,
        })
    }

    /// Create an adapter from settings, reading the API key from the environment.
    ///
    /// With no provider configured, checks in order:
    /// 1. OPENAI_API_KEY
    /// 2. ANTHROPIC_API_KEY
    pub fn from_settings(settings: &LlmSettings) -> ChatResult<Self> {
        Self::from_settings_with(settings, |var| std::env::var(var).ok())
    }

    fn from_settings_with(settings: &LlmSettings, lookup: impl Fn(&str) -> Option<String>) -> ChatResult<Self> {
        let (provider, api_key) = resolve_credentials(settings, lookup)?;
        Self::new(provider, api_key, settings.clone())
    }

    /// Get the current provider
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Get the current model
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        match (&self.settings.api_base, self.provider) {
            (Some(base), LlmProvider::OpenAI) => format!("{}/chat/completions", base.trim_end_matches('/')),
            (Some(base), LlmProvider::Anthropic) => format!("{}/messages", base.trim_end_matches('/')),
            (None, LlmProvider::OpenAI) => OPENAI_URL.to_string(),
            (None, LlmProvider::Anthropic) => ANTHROPIC_URL.to_string(),
        }
    }

    /// POST with retries on network errors, 5xx and 429.
    async fn post_with_retries<T: Serialize + Sync>(&self, body: &T) -> ChatResult<reqwest::Response> {
        let url = self.endpoint();
        let attempts = self.settings.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                // Exponential backoff: 2s, 4s, 8s
                let delay = Duration::from_secs(1 << attempt.min(5));
                tokio::time::sleep(delay).await;
            }

            let request = self.client.post(&url).json(body);
            let request = match self.provider {
                LlmProvider::OpenAI => request.header("Authorization", format!("Bearer {}", self.api_key)),
                LlmProvider::Anthropic => request
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01"),
            };

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("LLM request failed (attempt {}/{}): {}", attempt + 1, attempts, e);
                    last_error = Some(ChatError::LlmError(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {} (attempt {}/{})", status, attempt + 1, attempts);
                last_error = Some(ChatError::LlmError(format!("API error {}: {}", status, body)));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ChatError::LlmError(format!("API error {}: {}", status, body)));
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| ChatError::LlmError("Max retries exceeded".to_string())))
    }

    async fn complete_openai(&self, messages: &[Message], format: OutputFormat) -> ChatResult<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: (format == OutputFormat::Json).then(|| ResponseFormat {
                kind: "json_object".to_string(),
            }),
        };

        let result: OpenAIResponse = self
            .post_with_retries(&request)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::LlmError(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = result.usage {
            debug!(
                "OpenAI usage: {} prompt / {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ChatError::EmptyCompletion)
    }

    async fn complete_anthropic(&self, messages: &[Message], format: OutputFormat) -> ChatResult<String> {
        let mut system = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        if format == OutputFormat::Json {
            if !system.is_empty() {
                system.push_str("\n\n");
            }
            system.push_str(JSON_INSTRUCTION);
        }

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system: (!system.is_empty()).then_some(system),
            messages: messages
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .map(|m| AnthropicMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
        };

        let result: AnthropicResponse = self
            .post_with_retries(&request)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::LlmError(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = result.usage {
            debug!(
                "Anthropic usage: {} input / {} output tokens",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text: String = result
            .content
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(ChatError::EmptyCompletion);
        }
        Ok(text)
    }
}

#[async_trait]
impl ModelClient for LlmAdapter {
    async fn complete(&self, messages: &[Message], format: OutputFormat) -> ChatResult<String> {
        debug!("Calling {:?} model {} ({:?} output)", self.provider, self.model, format);
        match self.provider {
            LlmProvider::OpenAI => self.complete_openai(messages, format).await,
            LlmProvider::Anthropic => self.complete_anthropic(messages, format).await,
        }
    }
}

fn resolve_credentials(
    settings: &LlmSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> ChatResult<(LlmProvider, String)> {
    let key_for = |provider: LlmProvider| lookup(provider.api_key_var()).filter(|k| !k.is_empty());

    match settings.provider.as_deref() {
        Some(name) => {
            let provider = LlmProvider::from_name(name)?;
            let key = key_for(provider).ok_or(ChatError::LlmNotConfigured)?;
            Ok((provider, key))
        }
        None => [LlmProvider::OpenAI, LlmProvider::Anthropic]
            .into_iter()
            .find_map(|provider| key_for(provider).map(|key| (provider, key)))
            .ok_or(ChatError::LlmNotConfigured),
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}
