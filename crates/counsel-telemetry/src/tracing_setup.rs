//! Subscriber installation with optional OpenTelemetry spans.
//!
//! Formatted logs are always installed. With `otel`, the coordinator's
//! `tracing` spans are also recorded by an SDK tracer provider.

use crate::logging::{env_filter, fmt_layer, init_logging, LoggingConfig};
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_sdk::{
    trace::{Config, RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Subscriber settings for one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Record spans through OpenTelemetry as well as logging them
    pub otel: bool,
    /// `service.name` resource attribute and tracer name
    pub service: String,
    /// `deployment.environment` resource attribute
    pub deployment: String,
    /// Fraction of root spans kept, in [0, 1]
    pub sample_ratio: f64,
    /// Formatted log output
    pub logging: LoggingConfig,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            otel: false,
            service: "transfer-counsel".to_string(),
            deployment: "local".to_string(),
            sample_ratio: 1.0,
            logging: LoggingConfig::default(),
        }
    }
}

impl TracingConfig {
    /// Settings for `service` with OpenTelemetry off
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Toggle span recording
    #[must_use]
    pub fn with_otel(mut self, otel: bool) -> Self {
        self.otel = otel;
        self
    }

    /// Set the deployment environment
    #[must_use]
    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = deployment.into();
        self
    }

    /// Out-of-range ratios are clamped.
    #[must_use]
    pub fn with_sample_ratio(mut self, ratio: f64) -> Self {
        self.sample_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Replace the log output settings
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    fn sampler(&self) -> Sampler {
        match self.sample_ratio {
            r if r >= 1.0 => Sampler::AlwaysOn,
            r if r <= 0.0 => Sampler::AlwaysOff,
            r => Sampler::TraceIdRatioBased(r),
        }
    }

    fn resource(&self) -> Resource {
        Resource::new([
            KeyValue::new("service.name", self.service.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("deployment.environment", self.deployment.clone()),
        ])
    }
}

/// Install the global subscriber.
///
/// Returns the tracer provider when `otel` is set; hand it back to
/// [`shutdown_tracing`] before exit so buffered spans are flushed.
///
/// # Errors
/// Fails when a global subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<Option<TracerProvider>, TracingError> {
    if !config.otel {
        init_logging(&config.logging)?;
        return Ok(None);
    }

    let provider = TracerProvider::builder()
        .with_config(
            Config::default()
                .with_sampler(config.sampler())
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(config.resource()),
        )
        .build();
    let spans = tracing_opentelemetry::layer().with_tracer(provider.tracer(config.service.clone()));
    let logs = fmt_layer(&config.logging).with_filter(env_filter(&config.logging.level));

    tracing_subscriber::registry()
        .with(spans)
        .with(logs)
        .try_init()
        .map_err(|e| TracingError::Install(e.to_string()))?;

    tracing::debug!(
        service = %config.service,
        deployment = %config.deployment,
        sample_ratio = config.sample_ratio,
        "OpenTelemetry span recording on"
    );
    Ok(Some(provider))
}

/// Flush and drop the provider returned by [`init_tracing`].
pub fn shutdown_tracing(provider: Option<TracerProvider>) {
    let Some(provider) = provider else {
        return;
    };
    for result in provider.force_flush() {
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to flush spans");
        }
    }
}

/// Subscriber installation failure
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Another global subscriber won the race
    #[error("could not install tracing subscriber: {0}")]
    Install(String),
}
