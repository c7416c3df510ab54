//! Routing explanations.

use counsel_core::{AgentId, RouteDecision};
use serde::{Deserialize, Serialize};

/// Per-agent scoring detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExplanation {
    /// Agent identifier
    pub agent_id: AgentId,
    /// Agent label
    pub label: String,
    /// Tie-break rank
    pub priority: u32,
    /// Sum of matched weights
    pub score: f64,
    /// Share of the total positive score
    pub confidence: f64,
    /// Keywords that matched
    pub matched_keywords: Vec<String>,
}

/// Why a query was routed the way it was
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingExplanation {
    /// Original query
    pub query: String,
    /// Normalized query tokens
    pub tokens: Vec<String>,
    /// Every agent in registry order
    pub agents: Vec<AgentExplanation>,
    /// Resulting decision
    pub decision: RouteDecision,
}

impl RoutingExplanation {
    /// Selected primary agent
    pub fn selected(&self) -> &AgentId {
        self.decision.primary()
    }

    /// One-line summary of the decision
    pub fn reasoning(&self) -> String {
        let matched: Vec<&str> = self
            .decision
            .evidence(self.decision.primary())
            .iter()
            .map(String::as_str)
            .collect();

        if matched.is_empty() {
            format!("Selected {} as the general agent (no keyword matched)", self.selected())
        } else {
            format!(
                "Selected {} based on keywords: {}",
                self.selected(),
                matched.join(", ")
            )
        }
    }
}
