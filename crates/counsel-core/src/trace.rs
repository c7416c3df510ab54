//! Trace events and the tracer interface.

use crate::types::{AgentId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome tag of a processed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceOutcome {
    /// Every agent was served by the provider
    Routed,
    /// The guardrail blocked the query
    Blocked,
    /// At least one agent was served by fallback
    Fallback,
    /// The request aborted with an internal error
    Error,
}

impl TraceOutcome {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Routed => "routed",
            Self::Blocked => "blocked",
            Self::Fallback => "fallback",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TraceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record per processed query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Session the query belonged to
    pub session_id: SessionId,
    /// Turn sequence number, if a turn was recorded
    pub sequence_no: Option<u64>,
    /// Outcome tag
    pub outcome: TraceOutcome,
    /// Agents involved, in call order
    pub agents: Vec<AgentId>,
    /// End-to-end latency
    pub latency_ms: u64,
    /// When the event was produced
    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    /// Create an event stamped now
    #[must_use]
    pub fn new(session_id: SessionId, outcome: TraceOutcome) -> Self {
        Self {
            session_id,
            sequence_no: None,
            outcome,
            agents: Vec::new(),
            latency_ms: 0,
            timestamp: Utc::now(),
        }
    }

    /// Set the turn sequence number
    #[must_use]
    pub fn with_sequence_no(mut self, sequence_no: u64) -> Self {
        self.sequence_no = Some(sequence_no);
        self
    }

    /// Set the agents involved
    #[must_use]
    pub fn with_agents(mut self, agents: Vec<AgentId>) -> Self {
        self.agents = agents;
        self
    }

    /// Set the latency
    #[must_use]
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

/// Degraded-but-recovered condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceWarning {
    /// Affected session, if any
    pub session_id: Option<SessionId>,
    /// Component that recovered (e.g. `session_store`)
    pub component: String,
    /// What went wrong
    pub message: String,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

impl TraceWarning {
    /// Create a warning stamped now
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: None,
            component: component.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the affected session
    #[must_use]
    pub fn for_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Append-only structured event recorder
pub trait Tracer: Send + Sync {
    /// Record a query event
    fn record(&self, event: TraceEvent);

    /// Record a recovered failure
    fn warn(&self, warning: TraceWarning);
}

/// Tracer that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn record(&self, _event: TraceEvent) {}

    fn warn(&self, _warning: TraceWarning) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = TraceEvent::new(SessionId::new("s1"), TraceOutcome::Fallback)
            .with_sequence_no(3)
            .with_agents(vec![AgentId::new("financial_aid")])
            .with_latency_ms(12);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["sequence_no"], 3);
        assert_eq!(json["outcome"], "fallback");
        assert_eq!(json["agents"][0], "financial_aid");
        assert_eq!(json["latency_ms"], 12);
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(TraceOutcome::Blocked.to_string(), "blocked");
        assert_eq!(TraceOutcome::Routed.as_str(), "routed");
    }
}
