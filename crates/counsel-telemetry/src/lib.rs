//! # Counsel Telemetry
//!
//! Observability for the transfer counsel orchestrator.
//!
//! This crate provides:
//! - Structured logging to stderr (text or JSON)
//! - Optional OpenTelemetry span export
//! - Prometheus metrics for queries, agents, and breakers
//! - Tracer implementations (log, JSON lines, metrics, memory, composite)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;
pub mod tracer;
pub mod tracing_setup;

// Re-export main types
pub use logging::{init_logging, LoggingConfig};
pub use metrics::{Metrics, MetricsError};
pub use tracer::{CompositeTracer, JsonlTracer, LogTracer, MemoryTracer, MetricsTracer};
pub use tracing_setup::{init_tracing, shutdown_tracing, TracingConfig, TracingError};
