//! OpenAI provider against a mock server, driven through the coordinator

use crate::fixtures::*;
use crate::mock_providers::*;
use counsel_agents::{Coordinator, CoordinatorSettings, TopicGuardrail};
use counsel_core::{AgentId, ProviderErrorKind, ServedBy, SessionId};
use counsel_providers::{OpenAiConfig, OpenAiProvider};
use counsel_resilience::{BreakerRegistry, CircuitState};
use counsel_telemetry::MemoryTracer;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn coordinator_for(mock: &MockOpenAI) -> Coordinator {
    let provider = OpenAiProvider::new(
        OpenAiConfig::new("sk-test")
            .with_base_url(mock.url())
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap();

    Coordinator::builder()
        .registry(weighted_registry())
        .provider(Arc::new(provider))
        .guardrail(Arc::new(TopicGuardrail::default()))
        .breakers(Arc::new(
            BreakerRegistry::new(breaker_config(Duration::from_secs(60))).unwrap(),
        ))
        .tracer(Arc::new(MemoryTracer::default()))
        .settings(CoordinatorSettings::default().with_provider_timeout(Duration::from_secs(2)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_openai_answer_is_returned() {
    let mock = MockOpenAI::new().await;
    mock.mock_chat_completion("UC tuition is about $14,500 per year.").await;
    let coordinator = coordinator_for(&mock);

    let outcome = coordinator
        .process(COST_QUERY, &SessionId::new("s"), None)
        .await
        .unwrap();

    assert_eq!(outcome.response, "UC tuition is about $14,500 per year.");
    assert_eq!(
        outcome.served_by(&AgentId::new("financial_aid")),
        Some(ServedBy::Provider)
    );
    assert_eq!(mock.calls().await, 1);
}

#[tokio::test]
async fn test_server_errors_open_breaker_and_stop_requests() {
    let mock = MockOpenAI::new().await;
    mock.mock_server_error().await;
    let coordinator = coordinator_for(&mock);
    let session = SessionId::new("s");

    for _ in 0..3 {
        let outcome = coordinator.process(COST_QUERY, &session, None).await.unwrap();
        assert_eq!(outcome.invocations[0].failure, Some(ProviderErrorKind::Unknown));
    }
    assert_eq!(coordinator.breakers().state("financial_aid"), CircuitState::Open);

    let outcome = coordinator.process(COST_QUERY, &session, None).await.unwrap();
    assert_eq!(outcome.invocations[0].failure, Some(ProviderErrorKind::CircuitOpen));
    assert_eq!(mock.calls().await, 3);
}

#[tokio::test]
async fn test_rate_limit_is_served_by_fallback() {
    let mock = MockOpenAI::new().await;
    mock.mock_rate_limit(30).await;
    let coordinator = coordinator_for(&mock);

    let outcome = coordinator
        .process(COST_QUERY, &SessionId::new("s"), None)
        .await
        .unwrap();

    assert_eq!(outcome.invocations[0].failure, Some(ProviderErrorKind::RateLimited));
    assert!(outcome.response.contains("FAFSA"));
    // a 30s Retry-After is longer than any backoff the policy will wait
    assert_eq!(mock.calls().await, 1);
}

#[tokio::test]
async fn test_history_is_sent_as_messages() {
    let mock = MockOpenAI::new().await;
    mock.mock_chat_completion("answer").await;
    let coordinator = coordinator_for(&mock);
    let session = SessionId::new("s");

    coordinator.process(COST_QUERY, &session, None).await.unwrap();
    coordinator.process("And CSU tuition?", &session, None).await.unwrap();

    let requests = mock.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    let roles: Vec<&str> = messages.iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(messages[1]["content"], COST_QUERY);
    assert_eq!(messages[3]["content"], "And CSU tuition?");
}
