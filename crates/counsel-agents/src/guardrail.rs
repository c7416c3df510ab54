//! Topic guardrail.
//!
//! Keeps the conversation on transfer and career topics. Blocked topics win
//! over allowed ones; a query that matches nothing is off topic.

use counsel_config::GuardrailSettings;
use counsel_core::{Guardrail, GuardrailVerdict};
use counsel_routing::QueryTokens;
use tracing::debug;

/// Guardrail driven by topic lists
#[derive(Debug, Clone)]
pub struct TopicGuardrail {
    settings: GuardrailSettings,
}

impl Default for TopicGuardrail {
    fn default() -> Self {
        Self::new(GuardrailSettings::default())
    }
}

impl TopicGuardrail {
    /// Create a guardrail from settings
    #[must_use]
    pub const fn new(settings: GuardrailSettings) -> Self {
        Self { settings }
    }

    /// Active settings
    #[must_use]
    pub const fn settings(&self) -> &GuardrailSettings {
        &self.settings
    }

    /// Name of the allowed category the query falls in, if any
    #[must_use]
    pub fn category(&self, query: &str) -> Option<&str> {
        let tokens = QueryTokens::new(query);
        self.settings
            .allowed_topics
            .iter()
            .find(|c| tokens.contains_any(&c.keywords))
            .map(|c| c.name.as_str())
    }
}

impl Guardrail for TopicGuardrail {
    fn check(&self, query: &str) -> GuardrailVerdict {
        if !self.settings.enabled {
            return GuardrailVerdict::Allow;
        }

        let tokens = QueryTokens::new(query);

        if let Some(topic) = self
            .settings
            .blocked_topics
            .iter()
            .find(|t| tokens.contains(t))
        {
            debug!(topic = %topic, "Query matched a blocked topic");
            return GuardrailVerdict::block(&self.settings.blocked_message, "blocked_topic");
        }

        if let Some(category) = self
            .settings
            .allowed_topics
            .iter()
            .find(|c| tokens.contains_any(&c.keywords))
        {
            debug!(category = %category.name, "Query is on topic");
            return GuardrailVerdict::Allow;
        }

        if tokens.contains_any(&self.settings.contextual_indicators) {
            debug!("Query allowed by contextual indicator");
            return GuardrailVerdict::Allow;
        }

        GuardrailVerdict::block(&self.settings.off_topic_message, "off_topic")
    }
}
