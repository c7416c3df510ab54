//! Query coordinator.
//!
//! Runs one query through guardrail, router, breaker-guarded provider calls,
//! fallback, and merge, then records the turn and a trace event. Provider
//! and storage failures are absorbed here; only internal contract violations
//! reach the caller.

use crate::fallback::FallbackResponder;
use crate::synthesis::{merge, AgentReply};
use counsel_core::{
    AgentId, AgentInvocation, AgentProfile, AgentProvider, AllowAll, ConfigError,
    ConversationContext, Guardrail, GuardrailVerdict, NoopTracer, OrchestratorError,
    OrchestratorResult, ProfileRegistry, ProviderError, ProviderErrorKind, RouteDecision, ServedBy,
    SessionId, TraceEvent, TraceOutcome, Tracer, Turn, UserId,
};
use counsel_resilience::{with_timeout, BreakerRegistry, RetryPolicy};
use counsel_routing::{Router, RoutingExplanation};
use counsel_session::SessionStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, instrument, warn, Instrument};

/// Per-request behaviour of the coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSettings {
    /// Prior answered turns sent to the provider as context
    pub history_limit: usize,
    /// Bound on each agent call, retries included
    pub provider_timeout: Duration,
    /// Append a turn for guardrail-blocked queries
    pub record_blocked_turns: bool,
    /// Backoff for transient provider errors
    pub retry: RetryPolicy,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            history_limit: 10,
            provider_timeout: Duration::from_secs(30),
            record_blocked_turns: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl CoordinatorSettings {
    /// Set the history limit
    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Set the provider timeout
    #[must_use]
    pub const fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Choose whether blocked queries are recorded as turns
    #[must_use]
    pub const fn with_record_blocked_turns(mut self, record: bool) -> Self {
        self.record_blocked_turns = record;
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Result of one processed query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    /// Text returned to the user
    pub response: String,
    /// Agents that contributed, primary first
    pub agents_used: Vec<AgentId>,
    /// How each agent was served
    pub invocations: Vec<AgentInvocation>,
    /// Primary agent confidence (0 when blocked or nothing matched)
    pub confidence: f64,
    /// Session the turn belongs to
    pub session_id: SessionId,
    /// Sequence number of the recorded turn
    pub sequence_no: Option<u64>,
    /// Whether the guardrail blocked the query
    pub blocked: bool,
    /// Routing decision, absent when blocked
    pub decision: Option<RouteDecision>,
    /// End-to-end latency
    pub latency_ms: u64,
}

impl QueryOutcome {
    /// How the given agent was served
    #[must_use]
    pub fn served_by(&self, agent: &AgentId) -> Option<ServedBy> {
        self.invocations
            .iter()
            .find(|i| &i.agent_id == agent)
            .map(|i| i.served_by)
    }

    /// Trace outcome tag for this result
    #[must_use]
    pub fn trace_outcome(&self) -> TraceOutcome {
        if self.blocked {
            TraceOutcome::Blocked
        } else if self
            .invocations
            .iter()
            .all(|i| i.served_by == ServedBy::Provider)
        {
            TraceOutcome::Routed
        } else {
            TraceOutcome::Fallback
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Every agent named by the decision must exist in the registry
fn validate_decision(decision: &RouteDecision, registry: &ProfileRegistry) -> OrchestratorResult<()> {
    if decision.is_empty() {
        return Err(OrchestratorError::internal("routing decision names no agent"));
    }
    if let Some(unknown) = decision.agents().find(|id| registry.get(id).is_none()) {
        return Err(OrchestratorError::internal(format!(
            "routing decision names unknown agent '{unknown}'"
        )));
    }
    Ok(())
}

/// Routes queries to agents and assembles the reply
pub struct Coordinator {
    registry: Arc<ProfileRegistry>,
    router: Router,
    guardrail: Arc<dyn Guardrail>,
    provider: Arc<dyn AgentProvider>,
    breakers: Arc<BreakerRegistry>,
    fallback: Arc<FallbackResponder>,
    sessions: Arc<SessionStore>,
    tracer: Arc<dyn Tracer>,
    settings: CoordinatorSettings,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("agents", &self.registry.len())
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Create a coordinator builder
    #[must_use]
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    /// Agent registry
    #[must_use]
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Breaker registry
    #[must_use]
    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    /// Session store
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Active settings
    #[must_use]
    pub const fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Explain how a query would be routed, without calling anything
    #[must_use]
    pub fn explain(&self, query: &str) -> RoutingExplanation {
        self.router.explain(query, &self.registry)
    }

    /// Process one query for a session
    ///
    /// # Errors
    /// Returns `OrchestratorError::Internal` if routing produced a decision
    /// that does not fit the registry. Provider and storage failures are
    /// recovered and never returned.
    #[instrument(skip(self, query, session_id, user_id), fields(session_id = %session_id))]
    pub async fn process(
        &self,
        query: &str,
        session_id: &SessionId,
        user_id: Option<&UserId>,
    ) -> OrchestratorResult<QueryOutcome> {
        let start = Instant::now();

        if let GuardrailVerdict::Block { message, reason } = self.guardrail.check(query) {
            return Ok(self
                .blocked(query, session_id, user_id, message, &reason, start)
                .await);
        }
        self.sessions.get_or_create(session_id, user_id).await;

        let decision = self.router.route(query, &self.registry);
        if let Err(err) = validate_decision(&decision, &self.registry) {
            warn!(error = %err, "Rejecting routing decision");
            self.tracer.record(
                TraceEvent::new(session_id.clone(), TraceOutcome::Error)
                    .with_latency_ms(elapsed_ms(start)),
            );
            return Err(err);
        }

        debug!(
            primary = %decision.primary(),
            secondaries = decision.len() - 1,
            confidence = decision.confidence(),
            "Query routed"
        );

        let history = self
            .sessions
            .context_turns(session_id, self.settings.history_limit)
            .await;
        let context = ConversationContext::from_turns(session_id.clone(), &history);

        let mut replies = Vec::with_capacity(decision.len());
        let mut invocations = Vec::with_capacity(decision.len());
        for agent_id in decision.agents() {
            let Some(profile) = self.registry.get(agent_id) else {
                continue;
            };
            let (text, invocation) = self.call_agent(profile, query, &context).await;
            replies.push(AgentReply::new(agent_id.clone(), profile.label.clone(), text));
            invocations.push(invocation);
        }

        let response = merge(&replies);
        let agents_used: Vec<AgentId> = decision.agents().cloned().collect();
        let confidence = decision.confidence();

        let turn = Turn::new(query, Some(decision.clone()), invocations.clone(), response.clone());
        let sequence_no = self.sessions.append_turn(session_id, turn).await;

        let outcome = QueryOutcome {
            response,
            agents_used,
            invocations,
            confidence,
            session_id: session_id.clone(),
            sequence_no: Some(sequence_no),
            blocked: false,
            decision: Some(decision),
            latency_ms: elapsed_ms(start),
        };

        let trace_outcome = outcome.trace_outcome();
        self.tracer.record(
            TraceEvent::new(session_id.clone(), trace_outcome)
                .with_sequence_no(sequence_no)
                .with_agents(outcome.agents_used.clone())
                .with_latency_ms(outcome.latency_ms),
        );

        info!(
            outcome = %trace_outcome,
            agents = outcome.agents_used.len(),
            sequence_no,
            latency_ms = outcome.latency_ms,
            "Query processed"
        );

        Ok(outcome)
    }

    async fn blocked(
        &self,
        query: &str,
        session_id: &SessionId,
        user_id: Option<&UserId>,
        message: String,
        reason: &str,
        start: Instant,
    ) -> QueryOutcome {
        info!(reason = %reason, "Query blocked by guardrail");

        let sequence_no = if self.settings.record_blocked_turns {
            self.sessions.get_or_create(session_id, user_id).await;
            let turn = Turn::new(query, None, Vec::new(), message.clone());
            Some(self.sessions.append_turn(session_id, turn).await)
        } else {
            None
        };

        let latency_ms = elapsed_ms(start);
        let mut event = TraceEvent::new(session_id.clone(), TraceOutcome::Blocked)
            .with_latency_ms(latency_ms);
        if let Some(seq) = sequence_no {
            event = event.with_sequence_no(seq);
        }
        self.tracer.record(event);

        QueryOutcome {
            response: message,
            agents_used: Vec::new(),
            invocations: Vec::new(),
            confidence: 0.0,
            session_id: session_id.clone(),
            sequence_no,
            blocked: true,
            decision: None,
            latency_ms,
        }
    }

    /// Call one agent through its breaker, retrying transient errors.
    ///
    /// Every attempt takes its own breaker permit, so failed attempts count
    /// toward opening the circuit and an open circuit stops further
    /// retries. All attempts and backoff share the `provider_timeout`
    /// budget.
    async fn call_agent(
        &self,
        profile: &AgentProfile,
        query: &str,
        context: &ConversationContext,
    ) -> (String, AgentInvocation) {
        let start = Instant::now();
        let deadline = start + self.settings.provider_timeout;
        let endpoint = profile.endpoint();
        let breaker = self.breakers.get(endpoint);
        let mut attempts = 0u32;
        let mut last_error: Option<ProviderError> = None;

        loop {
            let Some(permit) = breaker.try_acquire() else {
                let failure = last_error
                    .as_ref()
                    .map_or(ProviderErrorKind::CircuitOpen, ProviderError::kind);
                debug!(agent = %profile.id, endpoint = %endpoint, attempts, "Circuit open, serving fallback");
                return self.fallback_reply(profile, query, failure, start);
            };
            attempts += 1;

            let span = info_span!(
                "agent_call",
                agent = %profile.id,
                endpoint = %endpoint,
                attempt = attempts,
                trial = permit.is_trial()
            );
            let remaining = deadline.saturating_duration_since(Instant::now());
            let result = with_timeout(remaining, self.provider.invoke(profile, query, context))
                .instrument(span)
                .await;

            let err = match result {
                Ok(text) => {
                    permit.success();
                    return (text, AgentInvocation::provider(profile.id.clone(), elapsed_ms(start)));
                }
                Err(err) => {
                    permit.failure();
                    err
                }
            };

            let delay = self
                .settings
                .retry
                .next_delay(&err, attempts)
                .filter(|delay| *delay < deadline.saturating_duration_since(Instant::now()));
            let Some(delay) = delay else {
                warn!(
                    agent = %profile.id,
                    endpoint = %endpoint,
                    attempts,
                    kind = %err.kind(),
                    error = %err,
                    "Provider call failed, serving fallback"
                );
                return self.fallback_reply(profile, query, err.kind(), start);
            };

            debug!(
                agent = %profile.id,
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Retrying provider call"
            );
            last_error = Some(err);
            tokio::time::sleep(delay).await;
        }
    }

    fn fallback_reply(
        &self,
        profile: &AgentProfile,
        query: &str,
        failure: ProviderErrorKind,
        start: Instant,
    ) -> (String, AgentInvocation) {
        let text = self.fallback.respond(&profile.id, query);
        let invocation = AgentInvocation::fallback(profile.id.clone(), failure, elapsed_ms(start));
        (text, invocation)
    }
}

/// Builder for [`Coordinator`]
#[derive(Default)]
pub struct CoordinatorBuilder {
    registry: Option<Arc<ProfileRegistry>>,
    router: Option<Router>,
    guardrail: Option<Arc<dyn Guardrail>>,
    provider: Option<Arc<dyn AgentProvider>>,
    breakers: Option<Arc<BreakerRegistry>>,
    fallback: Option<Arc<FallbackResponder>>,
    sessions: Option<Arc<SessionStore>>,
    tracer: Option<Arc<dyn Tracer>>,
    settings: CoordinatorSettings,
}

impl CoordinatorBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the agent registry (required)
    #[must_use]
    pub fn registry(mut self, registry: impl Into<Arc<ProfileRegistry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    /// Set the provider (required)
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn AgentProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the router (defaults to [`Router::default`])
    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Set the guardrail (defaults to [`AllowAll`])
    #[must_use]
    pub fn guardrail(mut self, guardrail: Arc<dyn Guardrail>) -> Self {
        self.guardrail = Some(guardrail);
        self
    }

    /// Set the breaker registry (defaults to default thresholds)
    #[must_use]
    pub fn breakers(mut self, breakers: Arc<BreakerRegistry>) -> Self {
        self.breakers = Some(breakers);
        self
    }

    /// Set the fallback table (defaults to the transfer guidance table)
    #[must_use]
    pub fn fallback(mut self, fallback: Arc<FallbackResponder>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Set the session store (defaults to in-memory)
    #[must_use]
    pub fn sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Set the tracer (defaults to [`NoopTracer`])
    #[must_use]
    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Set per-request settings
    #[must_use]
    pub fn settings(mut self, settings: CoordinatorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the coordinator
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the registry or provider is
    /// missing, or the provider timeout is zero
    pub fn build(self) -> Result<Coordinator, ConfigError> {
        let registry = self
            .registry
            .ok_or_else(|| ConfigError::invalid("coordinator.registry", "a profile registry is required"))?;
        let provider = self
            .provider
            .ok_or_else(|| ConfigError::invalid("coordinator.provider", "an agent provider is required"))?;
        if self.settings.provider_timeout.is_zero() {
            return Err(ConfigError::invalid(
                "coordinator.provider_timeout",
                "must be greater than zero",
            ));
        }

        Ok(Coordinator {
            registry,
            router: self.router.unwrap_or_default(),
            guardrail: self.guardrail.unwrap_or_else(|| Arc::new(AllowAll)),
            provider,
            breakers: self
                .breakers
                .unwrap_or_else(|| Arc::new(BreakerRegistry::default())),
            fallback: self
                .fallback
                .unwrap_or_else(|| Arc::new(FallbackResponder::transfer_defaults())),
            sessions: self
                .sessions
                .unwrap_or_else(|| Arc::new(SessionStore::in_memory())),
            tracer: self.tracer.unwrap_or_else(|| Arc::new(NoopTracer)),
            settings: self.settings,
        })
    }
}
