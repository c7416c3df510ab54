//! Sessions and turns.

use crate::decision::RouteDecision;
use crate::error::ProviderErrorKind;
use crate::types::{AgentId, SessionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an agent's part of a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServedBy {
    /// The external provider answered
    Provider,
    /// The canned fallback answered
    Fallback,
}

impl std::fmt::Display for ServedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider => write!(f, "provider"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// One agent invocation performed for a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInvocation {
    /// Agent that was asked
    pub agent_id: AgentId,
    /// Source of the text
    pub served_by: ServedBy,
    /// Why the provider was not used, when served by fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProviderErrorKind>,
    /// Wall time spent on this agent
    pub latency_ms: u64,
}

impl AgentInvocation {
    /// Invocation answered by the provider
    pub fn provider(agent_id: impl Into<AgentId>, latency_ms: u64) -> Self {
        Self {
            agent_id: agent_id.into(),
            served_by: ServedBy::Provider,
            failure: None,
            latency_ms,
        }
    }

    /// Invocation answered by the fallback responder
    pub fn fallback(agent_id: impl Into<AgentId>, failure: ProviderErrorKind, latency_ms: u64) -> Self {
        Self {
            agent_id: agent_id.into(),
            served_by: ServedBy::Fallback,
            failure: Some(failure),
            latency_ms,
        }
    }
}

/// One query/response exchange. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based position within the session, assigned by the store
    pub sequence_no: u64,
    /// User query
    pub query: String,
    /// Decision that produced the turn; absent for blocked queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<RouteDecision>,
    /// Agent invocations actually performed
    #[serde(default)]
    pub invocations: Vec<AgentInvocation>,
    /// Merged response text
    pub response: String,
    /// When the turn was created
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create an unsequenced turn; the store assigns `sequence_no` on append
    pub fn new(
        query: impl Into<String>,
        decision: Option<RouteDecision>,
        invocations: Vec<AgentInvocation>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            sequence_no: 0,
            query: query.into(),
            decision,
            invocations,
            response: response.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether this turn records a guardrail block
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.decision.is_none()
    }

    /// Agents that contributed to the response, in call order
    pub fn agents_used(&self) -> impl Iterator<Item = &AgentId> {
        self.invocations.iter().map(|i| &i.agent_id)
    }

    /// How a given agent was served in this turn
    #[must_use]
    pub fn served_by(&self, agent: &AgentId) -> Option<ServedBy> {
        self.invocations
            .iter()
            .find(|i| &i.agent_id == agent)
            .map(|i| i.served_by)
    }
}

/// A user's ordered conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,
    /// Owning user, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last append or access
    pub last_active: DateTime<Utc>,
    /// Append-only turns, ascending by sequence number
    #[serde(default)]
    pub turns: Vec<Turn>,
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new(id: SessionId, user_id: Option<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            created_at: now,
            last_active: now,
            turns: Vec::new(),
        }
    }

    /// Sequence number the next appended turn will receive
    #[must_use]
    pub fn next_sequence_no(&self) -> u64 {
        self.turns.last().map_or(1, |t| t.sequence_no + 1)
    }

    /// Append a turn, assigning its sequence number
    pub fn push_turn(&mut self, mut turn: Turn) -> u64 {
        let sequence_no = self.next_sequence_no();
        turn.sequence_no = sequence_no;
        self.last_active = Utc::now().max(turn.created_at);
        self.turns.push(turn);
        sequence_no
    }

    /// The last `limit` turns in ascending order
    #[must_use]
    pub fn recent(&self, limit: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(limit);
        &self.turns[start..]
    }

    /// The last `limit` turns that were answered, skipping blocked ones
    #[must_use]
    pub fn recent_answered(&self, limit: usize) -> Vec<Turn> {
        let mut answered: Vec<Turn> = self
            .turns
            .iter()
            .rev()
            .filter(|t| !t.is_blocked())
            .take(limit)
            .cloned()
            .collect();
        answered.reverse();
        answered
    }

    /// Number of turns
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }
}
