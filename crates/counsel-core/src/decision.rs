//! Routing decisions.

use crate::types::AgentId;
use serde::{Deserialize, Serialize};

/// Score of one agent for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentScore {
    /// Agent identifier
    pub agent_id: AgentId,
    /// Sum of matched keyword weights
    pub score: f64,
    /// Share of the total positive score, in `[0, 1]`
    pub confidence: f64,
    /// Keywords that matched, in profile order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<String>,
}

impl AgentScore {
    /// Create a score entry
    pub fn new(agent_id: impl Into<AgentId>, score: f64, confidence: f64) -> Self {
        Self {
            agent_id: agent_id.into(),
            score,
            confidence,
            matched: Vec::new(),
        }
    }

    /// Attach matched keyword evidence
    #[must_use]
    pub fn with_matched(mut self, matched: Vec<String>) -> Self {
        self.matched = matched;
        self
    }
}

/// Ranked selection of agents for a query.
///
/// Always names at least one agent: the primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    primary: AgentScore,
    #[serde(default)]
    secondaries: Vec<AgentScore>,
}

impl RouteDecision {
    /// Create a decision from a primary and ordered secondaries
    #[must_use]
    pub fn new(primary: AgentScore, secondaries: Vec<AgentScore>) -> Self {
        Self {
            primary,
            secondaries,
        }
    }

    /// Primary agent
    #[must_use]
    pub fn primary(&self) -> &AgentId {
        &self.primary.agent_id
    }

    /// Secondary agents, in call order
    pub fn secondaries(&self) -> impl Iterator<Item = &AgentId> {
        self.secondaries.iter().map(|s| &s.agent_id)
    }

    /// Primary then secondaries
    pub fn agents(&self) -> impl Iterator<Item = &AgentId> {
        std::iter::once(&self.primary.agent_id).chain(self.secondaries())
    }

    /// Scores for every selected agent, primary first
    pub fn scores(&self) -> impl Iterator<Item = &AgentScore> {
        std::iter::once(&self.primary).chain(self.secondaries.iter())
    }

    /// Confidence of the primary agent
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.primary.confidence
    }

    /// Confidence for a selected agent
    #[must_use]
    pub fn confidence_for(&self, agent: &AgentId) -> Option<f64> {
        self.scores()
            .find(|s| &s.agent_id == agent)
            .map(|s| s.confidence)
    }

    /// Matched keywords for a selected agent
    #[must_use]
    pub fn evidence(&self, agent: &AgentId) -> &[String] {
        self.scores()
            .find(|s| &s.agent_id == agent)
            .map_or(&[], |s| s.matched.as_slice())
    }

    /// Whether more than one agent was selected
    #[must_use]
    pub fn is_multi_agent(&self) -> bool {
        !self.secondaries.is_empty()
    }

    /// Number of selected agents
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.secondaries.len()
    }

    /// Always false; a decision names at least one agent
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}
