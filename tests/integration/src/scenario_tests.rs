//! End-to-end scenarios through the coordinator
//!
//! Routing, multi-agent merge, timeout-driven fallback, and guardrail blocks.

use crate::fixtures::*;
use crate::mock_providers::*;
use counsel_agents::FallbackResponder;
use counsel_core::{
    AgentId, ProviderErrorKind, ServedBy, SessionId, TraceOutcome,
};
use counsel_resilience::CircuitState;
use counsel_routing::Router;
use pretty_assertions::assert_eq;
use std::time::Duration;

/// Scenario A: a cost question goes to financial aid alone
#[tokio::test]
async fn test_cost_query_routes_to_financial_aid() {
    let h = HarnessBuilder::new(weighted_registry()).build();
    let session = SessionId::new("scenario-a");

    let outcome = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();

    let decision = outcome.decision.clone().unwrap();
    assert_eq!(decision.primary(), &AgentId::new("financial_aid"));
    assert_eq!(decision.secondaries().count(), 0);
    assert!(outcome.confidence > 0.0);
    assert_eq!(outcome.agents_used, vec![AgentId::new("financial_aid")]);
    assert_eq!(outcome.response, "financial_aid answer");
    assert_eq!(h.provider.calls_for("career_counselor"), 0);
}

/// Scenario B: a question spanning two specialists gets both sections
#[tokio::test]
async fn test_compare_query_merges_two_agents() {
    let h = HarnessBuilder::new(balanced_registry()).build();
    let session = SessionId::new("scenario-b");

    let outcome = h.coordinator.process(COMPARE_QUERY, &session, None).await.unwrap();

    assert_eq!(
        outcome.agents_used,
        vec![AgentId::new("financial_aid"), AgentId::new("career_counselor")]
    );
    assert_eq!(
        outcome.response,
        "## Financial Aid Specialist\n\nfinancial_aid answer\n\n\
         ## Career Counselor\n\ncareer_counselor answer"
    );
    assert_eq!(h.tracer.events()[0].outcome, TraceOutcome::Routed);
}

/// Scenario C: three timeouts open the breaker; the fourth call never reaches the provider
#[tokio::test]
async fn test_repeated_timeouts_open_breaker() {
    let provider = ScriptedProvider::new().with_script(
        "financial_aid",
        Script::Delayed(Duration::from_millis(500), "too late".to_string()),
    );
    let h = HarnessBuilder::new(weighted_registry())
        .provider(provider)
        .settings(fast_timeout(Duration::from_millis(20)))
        .build();
    let session = SessionId::new("scenario-c");
    let financial_aid = AgentId::new("financial_aid");

    for _ in 0..3 {
        let outcome = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
        assert_eq!(outcome.served_by(&financial_aid), Some(ServedBy::Fallback));
        assert_eq!(outcome.invocations[0].failure, Some(ProviderErrorKind::Timeout));
    }
    assert_eq!(h.coordinator.breakers().state("financial_aid"), CircuitState::Open);

    let fourth = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    assert_eq!(h.provider.calls_for("financial_aid"), 3);
    assert_eq!(fourth.served_by(&financial_aid), Some(ServedBy::Fallback));
    assert_eq!(fourth.invocations[0].failure, Some(ProviderErrorKind::CircuitOpen));
    assert_eq!(
        fourth.response,
        FallbackResponder::transfer_defaults().respond(&financial_aid, COST_QUERY)
    );

    let history = h.coordinator.sessions().history(&session, 10).await;
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].served_by(&financial_aid), Some(ServedBy::Fallback));
    assert_eq!(h.tracer.events()[3].outcome, TraceOutcome::Fallback);
}

/// Scenario D: an off-topic question is redirected without routing
#[tokio::test]
async fn test_off_topic_query_is_blocked() {
    let h = HarnessBuilder::new(balanced_registry()).build();
    let session = SessionId::new("scenario-d");

    let outcome = h.coordinator.process(MOVIE_QUERY, &session, None).await.unwrap();

    assert!(outcome.blocked);
    assert!(outcome.response.starts_with("I can only assist with questions related to transferring"));
    assert!(outcome.decision.is_none());
    assert!(outcome.agents_used.is_empty());
    assert!(h.provider.calls().is_empty());

    let events = h.tracer.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, TraceOutcome::Blocked);
    assert!(events[0].agents.is_empty());

    let history = h.coordinator.sessions().history(&session, 10).await;
    assert_eq!(history.len(), 1);
    assert!(history[0].is_blocked());
    assert!(history[0].invocations.is_empty());
}

#[tokio::test]
async fn test_unmatched_query_goes_to_general_agent() {
    let h = HarnessBuilder::new(balanced_registry()).build();
    let outcome = h
        .coordinator
        .process("Which UC campuses accept spring transfers?", &SessionId::new("s"), None)
        .await
        .unwrap();

    assert_eq!(outcome.agents_used, vec![AgentId::new("coordinator")]);
    assert!(outcome.confidence.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_routing_is_deterministic() {
    let router = Router::default();
    let registry = balanced_registry();
    let first = router.route(COMPARE_QUERY, &registry);
    for _ in 0..10 {
        assert_eq!(router.route(COMPARE_QUERY, &registry), first);
    }
}

#[tokio::test]
async fn test_failing_agent_without_canned_guidance_gets_generic_reply() {
    let registry = counsel_core::ProfileRegistry::new(
        vec![
            counsel_core::AgentProfile::new("housing", "Housing Advisor")
                .with_keywords(["housing", "dorm"], 1.0),
            counsel_core::AgentProfile::new("coordinator", "Transfer Coordinator"),
        ],
        "coordinator",
    )
    .unwrap();
    let provider = ScriptedProvider::new().with_script(
        "housing",
        Script::Fail(counsel_core::ProviderError::unknown("down")),
    );
    let h = HarnessBuilder::new(registry).provider(provider).build();

    let outcome = h
        .coordinator
        .process("Is UC housing guaranteed for transfers?", &SessionId::new("s"), None)
        .await
        .unwrap();

    assert_eq!(outcome.response, FallbackResponder::generic(&AgentId::new("housing")));
    assert_eq!(outcome.invocations[0].failure, Some(ProviderErrorKind::Unknown));
}
