//! Trace file and metrics produced by real queries

use crate::fixtures::*;
use crate::mock_providers::*;
use counsel_agents::{Coordinator, TopicGuardrail};
use counsel_core::{ProviderError, SessionId};
use counsel_session::SessionStore;
use counsel_telemetry::{CompositeTracer, JsonlTracer, Metrics, MetricsTracer};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

struct Observed {
    coordinator: Coordinator,
    metrics: Metrics,
    trace_file: std::path::PathBuf,
}

fn observed(dir: &TempDir, provider: ScriptedProvider) -> Observed {
    let metrics = Metrics::new().unwrap();
    let trace_file = dir.path().join("logs").join("agent_trace.jsonl");
    let tracer = Arc::new(
        CompositeTracer::new()
            .with(Arc::new(MetricsTracer::new(metrics.clone())))
            .with(Arc::new(JsonlTracer::open(&trace_file).unwrap())),
    );

    let coordinator = Coordinator::builder()
        .registry(balanced_registry())
        .provider(Arc::new(provider))
        .guardrail(Arc::new(TopicGuardrail::default()))
        .sessions(Arc::new(SessionStore::in_memory().with_tracer(tracer.clone())))
        .tracer(tracer)
        .build()
        .unwrap();

    Observed {
        coordinator,
        metrics,
        trace_file,
    }
}

fn read_lines(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_trace_file_has_one_line_per_query() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new().with_script(
        "career_counselor",
        Script::Fail(ProviderError::timeout(30_000)),
    );
    let o = observed(&dir, provider);
    let session = SessionId::new("traced");

    o.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    o.coordinator.process(COMPARE_QUERY, &session, None).await.unwrap();
    o.coordinator.process(MOVIE_QUERY, &session, None).await.unwrap();

    let lines = read_lines(&o.trace_file);
    assert_eq!(lines.len(), 3);

    let outcomes: Vec<&str> = lines.iter().map(|l| l["outcome"].as_str().unwrap()).collect();
    assert_eq!(outcomes, vec!["routed", "fallback", "blocked"]);

    assert_eq!(lines[0]["session_id"], "traced");
    assert_eq!(lines[0]["sequence_no"], 1);
    assert_eq!(lines[1]["agents"], serde_json::json!(["financial_aid", "career_counselor"]));
    assert_eq!(lines[2]["agents"], serde_json::json!([]));
    for line in &lines {
        assert!(line["latency_ms"].is_u64());
        assert!(line["timestamp"].is_string());
    }
}

#[tokio::test]
async fn test_metrics_count_outcomes() {
    let dir = TempDir::new().unwrap();
    let o = observed(&dir, ScriptedProvider::new());
    let session = SessionId::new("metered");

    o.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    o.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    o.coordinator.process(MOVIE_QUERY, &session, None).await.unwrap();

    assert_eq!(o.metrics.queries("routed"), 2);
    assert_eq!(o.metrics.queries("blocked"), 1);
    assert_eq!(o.metrics.queries("fallback"), 0);

    let text = o.metrics.render().unwrap();
    assert!(text.contains("counsel_query_latency_seconds"));
    assert!(text.contains(r#"counsel_agent_calls_total{agent="financial_aid",outcome="routed"} 2"#));
}
