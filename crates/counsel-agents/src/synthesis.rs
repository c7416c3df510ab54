//! Merging per-agent replies into one response.

use counsel_core::AgentId;

/// One agent's contribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    /// Responding agent
    pub agent_id: AgentId,
    /// Section heading
    pub label: String,
    /// Reply text
    pub text: String,
}

impl AgentReply {
    /// Create a reply
    pub fn new(agent_id: AgentId, label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            agent_id,
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Merge replies in the given order.
///
/// A single reply is returned verbatim. Several replies become
/// `## {label}` sections separated by a blank line.
#[must_use]
pub fn merge(replies: &[AgentReply]) -> String {
    match replies {
        [] => String::new(),
        [only] => only.text.clone(),
        many => many
            .iter()
            .map(|r| format!("## {}\n\n{}", r.label, r.text.trim_end()))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}
