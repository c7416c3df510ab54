//! Provider used when no API key is configured.
//!
//! Every call fails with an authentication error, so answers come from the
//! fallback responder and the breaker opens after the usual threshold.

use async_trait::async_trait;
use counsel_core::{AgentProfile, AgentProvider, ConversationContext, ProviderError};

/// Provider that is never reachable
#[derive(Debug, Clone, Default)]
pub struct OfflineProvider {
    reason: Option<String>,
}

impl OfflineProvider {
    /// Create an offline provider
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reason reported on every call
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[async_trait]
impl AgentProvider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    async fn invoke(
        &self,
        _profile: &AgentProfile,
        _query: &str,
        _context: &ConversationContext,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::auth(
            self.reason
                .as_deref()
                .unwrap_or("no API key configured"),
        ))
    }
}
