//! OpenAI-compatible chat completions provider.
//!
//! Posts to `{base_url}/v1/chat/completions` with the agent instructions as
//! the system message, the recent conversation, then the query.

use async_trait::async_trait;
use counsel_core::{
    AgentProfile, AgentProvider, ContextRole, ConversationContext, ProviderError,
};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI provider configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Provider instance name used in logs
    pub id: String,
    /// API key
    pub api_key: SecretString,
    /// Base URL without the `/v1` suffix
    pub base_url: String,
    /// Chat model
    pub model: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Completion token cap
    pub max_tokens: Option<u32>,
    /// HTTP client timeout; the coordinator applies its own tighter bound
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            id: "openai".to_string(),
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the HTTP timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// OpenAI-compatible provider
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new provider
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Configuration
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn build_messages<'a>(
        profile: &'a AgentProfile,
        query: &'a str,
        context: &'a ConversationContext,
    ) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(context.len() + 2);
        if let Some(instructions) = profile.instructions.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: instructions,
            });
        }
        messages.extend(context.messages.iter().map(|m| ChatMessage {
            role: match m.role {
                ContextRole::User => "user",
                ContextRole::Assistant => "assistant",
            },
            content: &m.content,
        }));
        messages.push(ChatMessage {
            role: "user",
            content: query,
        });
        messages
    }

    fn map_status(status: StatusCode, retry_after: Option<u64>, body: &str) -> ProviderError {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map_or_else(|_| format!("{status}: {body}"), |e| e.error.message);

        match status.as_u16() {
            401 | 403 => ProviderError::auth(message),
            429 => ProviderError::RateLimited {
                retry_after_secs: retry_after,
            },
            _ => ProviderError::unknown(message),
        }
    }

    fn map_transport(err: &reqwest::Error, timeout: Duration) -> ProviderError {
        if err.is_timeout() {
            ProviderError::timeout(timeout.as_millis() as u64)
        } else {
            ProviderError::unknown(format!("Request failed: {err}"))
        }
    }
}

#[async_trait]
impl AgentProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.config.id
    }

    async fn invoke(
        &self,
        profile: &AgentProfile,
        query: &str,
        context: &ConversationContext,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: Self::build_messages(profile, query, context),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(
            provider = %self.config.id,
            agent = %profile.id,
            model = %self.config.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::map_transport(&e, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let body = response.text().await.unwrap_or_default();
            warn!(
                provider = %self.config.id,
                agent = %profile.id,
                status = %status,
                "Chat completion request failed"
            );
            return Err(Self::map_status(status, retry_after, &body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::unknown(format!("Failed to parse response: {e}")))?;

        body.choices
            .into_iter()
            .find_map(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::unknown("Response contained no choices"))
    }
}
