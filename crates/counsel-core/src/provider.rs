//! Provider abstraction.
//!
//! A provider turns an agent profile, a query and the recent conversation
//! into response text. Every failure is reported as a [`ProviderError`] and
//! is handled by the caller's breaker and fallback path.

use crate::error::ProviderError;
use crate::profile::AgentProfile;
use crate::session::Turn;
use crate::types::SessionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Speaker of a context message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    /// The student
    User,
    /// A previous response
    Assistant,
}

/// One prior message supplied as context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    /// Speaker
    pub role: ContextRole,
    /// Message text
    pub content: String,
}

/// Recent conversation handed to the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Session the context belongs to
    pub session_id: Option<SessionId>,
    /// Messages in chronological order
    pub messages: Vec<ContextMessage>,
}

impl ConversationContext {
    /// Context with no prior messages
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build context from stored turns, skipping guardrail-blocked turns
    #[must_use]
    pub fn from_turns(session_id: SessionId, turns: &[Turn]) -> Self {
        let messages = turns
            .iter()
            .filter(|t| !t.is_blocked())
            .flat_map(|t| {
                [
                    ContextMessage {
                        role: ContextRole::User,
                        content: t.query.clone(),
                    },
                    ContextMessage {
                        role: ContextRole::Assistant,
                        content: t.response.clone(),
                    },
                ]
            })
            .collect();

        Self {
            session_id: Some(session_id),
            messages,
        }
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// External AI provider
#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Produce a response for `query` in the voice of `profile`.
    ///
    /// # Errors
    /// Returns a [`ProviderError`] on timeout, rate limiting, rejected
    /// credentials, or any other failure.
    async fn invoke(
        &self,
        profile: &AgentProfile,
        query: &str,
        context: &ConversationContext,
    ) -> Result<String, ProviderError>;
}
