//! Wiring of the coordinator from configuration.

use anyhow::{Context, Result};
use counsel_agents::{Coordinator, CoordinatorSettings, FallbackResponder, TopicGuardrail};
use counsel_config::{CounselConfig, ProviderSettings, SessionSettings, TelemetrySettings};
use counsel_core::{AgentProvider, Tracer};
use counsel_providers::{OfflineProvider, OpenAiConfig, OpenAiProvider};
use counsel_resilience::{BreakerRegistry, RetryPolicy};
use counsel_routing::Router;
use counsel_session::{PoolConfig, SessionStore, SqliteSessionBackend};
use counsel_telemetry::{
    CompositeTracer, JsonlTracer, LogTracer, LoggingConfig, Metrics, MetricsTracer, TracingConfig,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a command needs to answer queries
pub struct Runtime {
    /// Shared coordinator
    pub coordinator: Arc<Coordinator>,
    /// Metrics fed by the tracer
    pub metrics: Metrics,
}

impl Runtime {
    /// Build the runtime from a validated configuration
    pub async fn build(config: &CounselConfig) -> Result<Self> {
        let metrics = Metrics::new().context("failed to register metrics")?;
        let tracer = build_tracer(&config.telemetry, &metrics);
        let sessions = build_session_store(&config.session, Arc::clone(&tracer)).await;

        let coordinator = Coordinator::builder()
            .registry(config.build_registry()?)
            .provider(build_provider(&config.provider)?)
            .router(Router::new(config.router.clone())?)
            .guardrail(Arc::new(TopicGuardrail::new(config.guardrail.clone())))
            .breakers(Arc::new(BreakerRegistry::new(config.breaker.clone())?))
            .fallback(Arc::new(FallbackResponder::transfer_defaults()))
            .sessions(Arc::new(sessions))
            .tracer(tracer)
            .settings(coordinator_settings(config)?)
            .build()?;

        Ok(Self {
            coordinator: Arc::new(coordinator),
            metrics,
        })
    }

    /// Copy breaker states into the gauges
    pub fn publish_breakers(&self) {
        for stats in self.coordinator.breakers().stats() {
            self.metrics
                .set_breaker_state(&stats.endpoint, stats.state.as_gauge());
        }
    }
}

/// Coordinator settings derived from the session, provider and retry sections
pub fn coordinator_settings(config: &CounselConfig) -> Result<CoordinatorSettings> {
    let retry = RetryPolicy::new(config.retry.clone())?;
    Ok(CoordinatorSettings::default()
        .with_history_limit(config.session.history_limit)
        .with_provider_timeout(config.provider.timeout)
        .with_record_blocked_turns(config.session.record_blocked_turns)
        .with_retry(retry))
}

/// Provider for the configured kind; offline when no API key is set
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn AgentProvider>> {
    let key = match (&settings.kind, &settings.api_key) {
        (counsel_config::ProviderKind::OpenAi, Some(key)) => key,
        (counsel_config::ProviderKind::OpenAi, None) => {
            warn!(
                env = %settings.api_key_env,
                "No API key configured, answering from fallback guidance"
            );
            return Ok(Arc::new(
                OfflineProvider::new().with_reason(format!("{} not set", settings.api_key_env)),
            ));
        }
        (counsel_config::ProviderKind::Offline, _) => {
            info!("Provider disabled by configuration");
            return Ok(Arc::new(
                OfflineProvider::new().with_reason("provider disabled by configuration"),
            ));
        }
    };

    let mut openai = OpenAiConfig::new(key.expose_secret().clone())
        .with_base_url(&settings.base_url)
        .with_model(&settings.model)
        .with_timeout(settings.timeout);
    openai.temperature = settings.temperature;
    openai.max_tokens = settings.max_tokens;

    let provider = OpenAiProvider::new(openai).context("failed to create OpenAI provider")?;
    info!(model = %settings.model, base_url = %settings.base_url, "Using OpenAI provider");
    Ok(Arc::new(provider))
}

/// Session store for the configured persistence.
///
/// A database that cannot be opened degrades to an in-memory store.
pub async fn build_session_store(settings: &SessionSettings, tracer: Arc<dyn Tracer>) -> SessionStore {
    if !settings.persistence {
        return SessionStore::in_memory().with_tracer(tracer);
    }

    let pool = PoolConfig::new(&settings.database_url).max_connections(settings.max_connections);
    match SqliteSessionBackend::connect(&pool).await {
        Ok(backend) => {
            info!(database_url = %settings.database_url, "Session persistence enabled");
            SessionStore::with_backend(Arc::new(backend)).with_tracer(tracer)
        }
        Err(err) => {
            warn!(
                database_url = %settings.database_url,
                error = %err,
                "Session database unavailable, keeping sessions in memory"
            );
            tracer.warn(counsel_core::TraceWarning::new(
                "session_store",
                format!("connect failed: {err}"),
            ));
            SessionStore::in_memory().with_tracer(tracer)
        }
    }
}

/// Tracer fan-out: log, metrics, and the JSONL trace file when enabled
pub fn build_tracer(settings: &TelemetrySettings, metrics: &Metrics) -> Arc<dyn Tracer> {
    let mut tracer = CompositeTracer::new()
        .with(Arc::new(LogTracer))
        .with(Arc::new(MetricsTracer::new(metrics.clone())));

    if settings.enable_trace_file {
        match JsonlTracer::open(&settings.trace_file) {
            Ok(jsonl) => tracer = tracer.with(Arc::new(jsonl)),
            Err(err) => warn!(
                path = %settings.trace_file.display(),
                error = %err,
                "Cannot open trace file, continuing without it"
            ),
        }
    }

    Arc::new(tracer)
}

/// Telemetry setup for the configured level, raised by `-v` flags
pub fn tracing_config(settings: &TelemetrySettings, verbose: u8, json: bool) -> TracingConfig {
    let level = match verbose {
        0 => settings.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let logging = LoggingConfig::new(level)
        .with_json(settings.json_logs || json)
        .with_target(verbose > 1);

    TracingConfig::new("transfer-counsel")
        .with_otel(settings.otel)
        .with_logging(logging)
}
