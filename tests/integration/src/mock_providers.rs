//! Mock agent providers for integration testing
//!
//! [`ScriptedProvider`] answers in process with per-agent behavior.
//! [`MockOpenAI`] is a wiremock server speaking the chat completions API.

use async_trait::async_trait;
use counsel_core::{AgentProfile, AgentProvider, ConversationContext, ProviderError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// What the scripted provider does for one agent
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer immediately with the text
    Reply(String),
    /// Answer after a delay
    Delayed(Duration, String),
    /// Fail with the error
    Fail(ProviderError),
}

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub agent: String,
    pub query: String,
    pub context_len: usize,
}

/// In-process provider with per-agent scripts.
///
/// Agents without a script answer `"<agent id> answer"`.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    /// Provider where every agent answers immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the script for an agent
    pub fn with_script(self, agent: &str, script: Script) -> Self {
        self.set_script(agent, script);
        self
    }

    /// Replace the script for an agent while the provider is in use
    pub fn set_script(&self, agent: &str, script: Script) {
        self.scripts.lock().insert(agent.to_string(), script);
    }

    /// All calls in arrival order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls that reached the provider for an agent
    pub fn calls_for(&self, agent: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.agent == agent).count()
    }
}

#[async_trait]
impl AgentProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(
        &self,
        profile: &AgentProfile,
        query: &str,
        context: &ConversationContext,
    ) -> Result<String, ProviderError> {
        self.calls.lock().push(RecordedCall {
            agent: profile.id.to_string(),
            query: query.to_string(),
            context_len: context.len(),
        });

        let script = self.scripts.lock().get(profile.id.as_str()).cloned();
        match script {
            None => Ok(format!("{} answer", profile.id)),
            Some(Script::Reply(text)) => Ok(text),
            Some(Script::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Some(Script::Fail(err)) => Err(err),
        }
    }
}

/// Mock OpenAI API server
pub struct MockOpenAI {
    pub server: MockServer,
}

impl MockOpenAI {
    /// Start a new mock server
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL for this mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Number of chat completion requests received
    pub async fn calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    /// Answer every chat completion with the content
    pub async fn mock_chat_completion(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(content)))
            .mount(&self.server)
            .await;
    }

    /// Fail every chat completion with a 500
    pub async fn mock_server_error(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(error_response("server_error", "Internal server error")),
            )
            .mount(&self.server)
            .await;
    }

    /// Rate limit every chat completion
    pub async fn mock_rate_limit(&self, retry_after_secs: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(error_response("rate_limit_exceeded", "Rate limit exceeded"))
                    .append_header("Retry-After", retry_after_secs.to_string().as_str()),
            )
            .mount(&self.server)
            .await;
    }
}

/// Chat completion body with one choice
pub fn chat_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 20, "completion_tokens": 10, "total_tokens": 30 }
    })
}

/// OpenAI-style error body
pub fn error_response(code: &str, message: &str) -> Value {
    json!({
        "error": { "message": message, "type": code, "code": code }
    })
}
