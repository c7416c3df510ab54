//! Prometheus metrics for processed queries.

use counsel_core::{TraceEvent, TraceWarning};
use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_vec_with_registry, Encoder, Histogram, IntCounterVec, IntGaugeVec,
    Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics error
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Registration or encoding failed
    #[error("Metrics error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Encoded output was not UTF-8
    #[error("Metrics output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Orchestrator metrics, each in its own registry
#[derive(Clone)]
pub struct Metrics {
    queries_total: IntCounterVec,
    agent_calls_total: IntCounterVec,
    query_latency_seconds: Histogram,
    breaker_state: IntGaugeVec,
    warnings_total: IntCounterVec,
    registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Register all metrics in a fresh registry
    ///
    /// # Errors
    /// Returns error if a metric definition is rejected
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let queries_total = register_int_counter_vec_with_registry!(
            "counsel_queries_total",
            "Processed queries by outcome",
            &["outcome"],
            registry
        )?;

        let agent_calls_total = register_int_counter_vec_with_registry!(
            "counsel_agent_calls_total",
            "Agent involvements by agent and query outcome",
            &["agent", "outcome"],
            registry
        )?;

        let query_latency_seconds = register_histogram_with_registry!(
            "counsel_query_latency_seconds",
            "End-to-end query latency in seconds",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
            registry
        )?;

        let breaker_state = register_int_gauge_vec_with_registry!(
            "counsel_breaker_state",
            "Circuit breaker state per endpoint (0=closed, 1=open, 2=half_open)",
            &["endpoint"],
            registry
        )?;

        let warnings_total = register_int_counter_vec_with_registry!(
            "counsel_warnings_total",
            "Degradation warnings by component",
            &["component"],
            registry
        )?;

        Ok(Self {
            queries_total,
            agent_calls_total,
            query_latency_seconds,
            breaker_state,
            warnings_total,
            registry: Arc::new(registry),
        })
    }

    /// Record one processed query
    pub fn record_event(&self, event: &TraceEvent) {
        let outcome = event.outcome.as_str();
        self.queries_total.with_label_values(&[outcome]).inc();
        for agent in &event.agents {
            self.agent_calls_total
                .with_label_values(&[agent.as_str(), outcome])
                .inc();
        }
        #[allow(clippy::cast_precision_loss)]
        self.query_latency_seconds
            .observe(event.latency_ms as f64 / 1000.0);
    }

    /// Record one degradation warning
    pub fn record_warning(&self, warning: &TraceWarning) {
        self.warnings_total
            .with_label_values(&[warning.component.as_str()])
            .inc();
    }

    /// Publish a breaker state gauge value
    pub fn set_breaker_state(&self, endpoint: &str, state: i64) {
        self.breaker_state.with_label_values(&[endpoint]).set(state);
    }

    /// Count of queries recorded with the given outcome label
    #[must_use]
    pub fn queries(&self, outcome: &str) -> u64 {
        self.queries_total.with_label_values(&[outcome]).get()
    }

    /// Export in Prometheus text format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn render(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::{AgentId, SessionId, TraceOutcome};

    #[test]
    fn test_record_event_counts_outcome_and_agents() {
        let metrics = Metrics::new().unwrap();
        let event = TraceEvent::new(SessionId::new("s1"), TraceOutcome::Fallback)
            .with_agents(vec![AgentId::new("financial_aid"), AgentId::new("career_counselor")])
            .with_latency_ms(120);

        metrics.record_event(&event);
        metrics.record_event(&TraceEvent::new(SessionId::new("s1"), TraceOutcome::Blocked));

        assert_eq!(metrics.queries("fallback"), 1);
        assert_eq!(metrics.queries("blocked"), 1);
        assert_eq!(metrics.queries("routed"), 0);

        let text = metrics.render().unwrap();
        assert!(text.contains(
            r#"counsel_agent_calls_total{agent="financial_aid",outcome="fallback"} 1"#
        ));
        assert!(text.contains("counsel_query_latency_seconds_count 2"));
    }

    #[test]
    fn test_breaker_gauge_and_warnings() {
        let metrics = Metrics::new().unwrap();
        metrics.set_breaker_state("openai", 1);
        metrics.record_warning(&TraceWarning::new("session_store", "save failed"));

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"counsel_breaker_state{endpoint="openai"} 1"#));
        assert!(text.contains(r#"counsel_warnings_total{component="session_store"} 1"#));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_event(&TraceEvent::new(SessionId::new("s"), TraceOutcome::Routed));
        assert_eq!(a.queries("routed"), 1);
        assert_eq!(b.queries("routed"), 0);
    }
}
