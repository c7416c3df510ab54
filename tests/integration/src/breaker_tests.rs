//! Circuit breaker behavior through the coordinator

use crate::fixtures::*;
use crate::mock_providers::*;
use counsel_core::{AgentId, ProviderError, ProviderErrorKind, ServedBy, SessionId};
use counsel_resilience::CircuitState;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use std::time::Duration;

const RESET: Duration = Duration::from_millis(100);

fn failing() -> Script {
    Script::Fail(ProviderError::unknown("service unavailable"))
}

async fn trip(h: &TestHarness, session: &SessionId) {
    for _ in 0..3 {
        h.coordinator.process(COST_QUERY, session, None).await.unwrap();
    }
    assert_eq!(h.coordinator.breakers().state("financial_aid"), CircuitState::Open);
}

#[tokio::test]
async fn test_trial_success_closes_breaker() {
    let h = HarnessBuilder::new(weighted_registry())
        .provider(ScriptedProvider::new().with_script("financial_aid", failing()))
        .breaker(breaker_config(RESET))
        .build();
    let session = SessionId::new("s");
    trip(&h, &session).await;

    h.provider
        .set_script("financial_aid", Script::Reply("recovered".to_string()));
    tokio::time::sleep(RESET + Duration::from_millis(50)).await;

    let outcome = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    assert_eq!(outcome.response, "recovered");
    assert_eq!(
        outcome.served_by(&AgentId::new("financial_aid")),
        Some(ServedBy::Provider)
    );
    assert_eq!(h.coordinator.breakers().state("financial_aid"), CircuitState::Closed);
    assert_eq!(h.provider.calls_for("financial_aid"), 4);
}

#[tokio::test]
async fn test_trial_failure_reopens_breaker() {
    let h = HarnessBuilder::new(weighted_registry())
        .provider(ScriptedProvider::new().with_script("financial_aid", failing()))
        .breaker(breaker_config(RESET))
        .build();
    let session = SessionId::new("s");
    trip(&h, &session).await;

    tokio::time::sleep(RESET + Duration::from_millis(50)).await;
    let trial = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    assert_eq!(trial.invocations[0].failure, Some(ProviderErrorKind::Unknown));
    assert_eq!(h.coordinator.breakers().state("financial_aid"), CircuitState::Open);

    let rejected = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    assert_eq!(rejected.invocations[0].failure, Some(ProviderErrorKind::CircuitOpen));
    assert_eq!(h.provider.calls_for("financial_aid"), 4);
}

#[tokio::test]
async fn test_single_trial_admitted_under_concurrency() {
    let h = HarnessBuilder::new(weighted_registry())
        .provider(ScriptedProvider::new().with_script("financial_aid", failing()))
        .breaker(breaker_config(RESET))
        .build();
    trip(&h, &SessionId::new("warmup")).await;

    h.provider.set_script(
        "financial_aid",
        Script::Delayed(Duration::from_millis(100), "slow recovery".to_string()),
    );
    tokio::time::sleep(RESET + Duration::from_millis(50)).await;

    let tasks = (0..5).map(|i| {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .process(COST_QUERY, &SessionId::new(format!("user-{i}")), None)
                .await
                .unwrap()
        })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let served: Vec<_> = outcomes
        .iter()
        .filter(|o| o.invocations[0].served_by == ServedBy::Provider)
        .collect();
    assert_eq!(served.len(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| o.invocations[0].failure == Some(ProviderErrorKind::CircuitOpen))
            .count(),
        4
    );
    assert_eq!(h.provider.calls_for("financial_aid"), 4);
    assert_eq!(h.coordinator.breakers().state("financial_aid"), CircuitState::Closed);
}

#[tokio::test]
async fn test_breakers_are_per_agent() {
    let h = HarnessBuilder::new(balanced_registry())
        .provider(ScriptedProvider::new().with_script("financial_aid", failing()))
        .build();
    let session = SessionId::new("s");

    for _ in 0..3 {
        h.coordinator.process(COMPARE_QUERY, &session, None).await.unwrap();
    }

    assert_eq!(h.coordinator.breakers().state("financial_aid"), CircuitState::Open);
    assert_eq!(h.coordinator.breakers().state("career_counselor"), CircuitState::Closed);

    let outcome = h.coordinator.process(COMPARE_QUERY, &session, None).await.unwrap();
    assert_eq!(
        outcome.served_by(&AgentId::new("career_counselor")),
        Some(ServedBy::Provider)
    );
    assert!(outcome.response.contains("career_counselor answer"));
}

#[tokio::test]
async fn test_success_resets_failure_streak() {
    let h = HarnessBuilder::new(weighted_registry())
        .provider(ScriptedProvider::new().with_script("financial_aid", failing()))
        .build();
    let session = SessionId::new("s");

    for _ in 0..2 {
        h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    }
    h.provider.set_script("financial_aid", Script::Reply("ok".to_string()));
    h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    h.provider.set_script("financial_aid", failing());
    for _ in 0..2 {
        h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    }

    assert_eq!(h.coordinator.breakers().state("financial_aid"), CircuitState::Closed);
    assert_eq!(h.provider.calls_for("financial_aid"), 5);
}
