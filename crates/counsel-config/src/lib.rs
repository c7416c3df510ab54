//! # Counsel Config
//!
//! Configuration for the transfer counsel orchestrator.
//!
//! - Typed sections for routing, breakers, provider, sessions, telemetry,
//!   guardrail, and the agent roster
//! - YAML or TOML files layered over defaults
//! - Environment overrides and validation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agents;
pub mod config;
pub mod guardrail;
pub mod loader;

// Re-export main types
pub use agents::{default_profiles, AgentSettings};
pub use config::{CounselConfig, ProviderKind, ProviderSettings, SessionSettings, TelemetrySettings};
pub use guardrail::{GuardrailSettings, TopicCategory};
pub use loader::{read_file, ConfigLoader, DEFAULT_CONFIG_FILES};
