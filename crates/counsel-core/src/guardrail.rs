//! Pre-routing guardrail interface.

use serde::{Deserialize, Serialize};

/// Result of a guardrail check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum GuardrailVerdict {
    /// Query may be routed
    Allow,
    /// Query is rejected and answered with a redirect message
    Block {
        /// Text returned to the user
        message: String,
        /// Short machine-readable reason (e.g. `blocked_topic`, `off_topic`)
        reason: String,
    },
}

impl GuardrailVerdict {
    /// Create a block verdict
    pub fn block(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Block {
            message: message.into(),
            reason: reason.into(),
        }
    }

    /// Whether the query was allowed
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Classifies a query before routing
pub trait Guardrail: Send + Sync {
    /// Check the query
    fn check(&self, query: &str) -> GuardrailVerdict;
}

/// Guardrail that allows every query
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Guardrail for AllowAll {
    fn check(&self, _query: &str) -> GuardrailVerdict {
        GuardrailVerdict::Allow
    }
}
