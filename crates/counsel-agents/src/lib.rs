//! # Counsel Agents
//!
//! Query coordination for the transfer counsel orchestrator.
//!
//! This crate provides:
//! - [`Coordinator`]: guardrail, routing, breaker-guarded provider calls,
//!   fallback, and merge for one query
//! - [`TopicGuardrail`]: keeps queries on transfer and career topics
//! - [`FallbackResponder`]: canned guidance when the provider is unavailable
//! - [`merge`]: stable composition of multi-agent replies
//!
//! ## Example
//!
//! ```ignore
//! use counsel_agents::Coordinator;
//!
//! let coordinator = Coordinator::builder()
//!     .registry(registry)
//!     .provider(provider)
//!     .build()?;
//!
//! let outcome = coordinator.process("How much is UC tuition?", &session_id, None).await?;
//! println!("{}", outcome.response);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coordinator;
pub mod fallback;
pub mod guardrail;
pub mod synthesis;

// Re-export main types
pub use coordinator::{Coordinator, CoordinatorBuilder, CoordinatorSettings, QueryOutcome};
pub use fallback::{FallbackIntent, FallbackResponder};
pub use guardrail::TopicGuardrail;
pub use synthesis::{merge, AgentReply};
