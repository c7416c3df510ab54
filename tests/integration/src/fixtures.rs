//! Test fixtures for integration tests

use crate::mock_providers::ScriptedProvider;
use counsel_agents::{Coordinator, CoordinatorSettings, TopicGuardrail};
use counsel_core::{AgentProfile, AgentProvider, ProfileRegistry, Tracer};
use counsel_resilience::{BreakerRegistry, CircuitBreakerConfig};
use counsel_session::SessionStore;
use counsel_telemetry::MemoryTracer;
use std::sync::Arc;
use std::time::Duration;

pub const COST_QUERY: &str = "How much does UC Berkeley cost?";
pub const COMPARE_QUERY: &str = "compare salary and tuition for CS majors";
pub const MOVIE_QUERY: &str = "what's a good movie to watch";

/// Financial aid heavily weighted on cost; career present with zero weight
pub fn weighted_registry() -> ProfileRegistry {
    ProfileRegistry::new(
        vec![
            AgentProfile::new("financial_aid", "Financial Aid Specialist")
                .with_priority(1)
                .with_keywords(["cost", "tuition"], 5.0)
                .with_instructions("You help transfer students plan how to pay for college."),
            AgentProfile::new("career_counselor", "Career Counselor")
                .with_priority(2)
                .with_keywords(["cost", "salary"], 0.0),
            AgentProfile::new("coordinator", "Transfer Coordinator").with_priority(4),
        ],
        "coordinator",
    )
    .unwrap()
}

/// Two specialists with unit weights plus the general agent
pub fn balanced_registry() -> ProfileRegistry {
    ProfileRegistry::new(
        vec![
            AgentProfile::new("financial_aid", "Financial Aid Specialist")
                .with_priority(1)
                .with_keywords(["cost", "tuition"], 1.0),
            AgentProfile::new("career_counselor", "Career Counselor")
                .with_priority(3)
                .with_keywords(["salary", "career"], 1.0),
            AgentProfile::new("coordinator", "Transfer Coordinator").with_priority(4),
        ],
        "coordinator",
    )
    .unwrap()
}

/// Breaker thresholds used across tests
pub fn breaker_config(reset_timeout: Duration) -> CircuitBreakerConfig {
    CircuitBreakerConfig::new(3, reset_timeout)
}

/// A coordinator with its collaborators exposed for assertions
pub struct TestHarness {
    pub coordinator: Arc<Coordinator>,
    pub provider: Arc<ScriptedProvider>,
    pub tracer: Arc<MemoryTracer>,
}

/// Builder for [`TestHarness`]
pub struct HarnessBuilder {
    registry: ProfileRegistry,
    provider: Arc<ScriptedProvider>,
    breaker: CircuitBreakerConfig,
    settings: CoordinatorSettings,
    sessions: Option<SessionStore>,
}

impl HarnessBuilder {
    pub fn new(registry: ProfileRegistry) -> Self {
        Self {
            registry,
            provider: Arc::new(ScriptedProvider::new()),
            breaker: breaker_config(Duration::from_secs(60)),
            settings: CoordinatorSettings::default(),
            sessions: None,
        }
    }

    pub fn provider(mut self, provider: ScriptedProvider) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker = config;
        self
    }

    pub fn settings(mut self, settings: CoordinatorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn build(self) -> TestHarness {
        let tracer = Arc::new(MemoryTracer::default());
        let sessions = self
            .sessions
            .unwrap_or_else(SessionStore::in_memory)
            .with_tracer(tracer.clone() as Arc<dyn Tracer>);

        let coordinator = Coordinator::builder()
            .registry(self.registry)
            .provider(self.provider.clone() as Arc<dyn AgentProvider>)
            .guardrail(Arc::new(TopicGuardrail::default()))
            .breakers(Arc::new(BreakerRegistry::new(self.breaker).unwrap()))
            .sessions(Arc::new(sessions))
            .tracer(tracer.clone())
            .settings(self.settings)
            .build()
            .unwrap();

        TestHarness {
            coordinator: Arc::new(coordinator),
            provider: self.provider,
            tracer,
        }
    }
}

/// Settings with a short provider timeout
pub fn fast_timeout(timeout: Duration) -> CoordinatorSettings {
    CoordinatorSettings::default().with_provider_timeout(timeout)
}
