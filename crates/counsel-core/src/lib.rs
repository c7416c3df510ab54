//! # Counsel Core
//!
//! Core types, traits, and error handling for the transfer counsel orchestrator.
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Identifier newtypes for agents, sessions, and users
//! - Agent profiles and the profile registry
//! - Routing decisions, sessions, and turns
//! - Collaborator traits (provider, guardrail, tracer)
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod decision;
pub mod error;
pub mod guardrail;
pub mod profile;
pub mod provider;
pub mod session;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use decision::{AgentScore, RouteDecision};
pub use error::{
    ConfigError, OrchestratorError, OrchestratorResult, ProviderError, ProviderErrorKind,
    StorageError,
};
pub use guardrail::{AllowAll, Guardrail, GuardrailVerdict};
pub use profile::{AgentProfile, Keyword, ProfileRegistry};
pub use provider::{AgentProvider, ContextMessage, ContextRole, ConversationContext};
pub use session::{AgentInvocation, ServedBy, Session, Turn};
pub use trace::{NoopTracer, TraceEvent, TraceOutcome, TraceWarning, Tracer};
pub use types::{AgentId, SessionId, UserId};
