//! Integration tests for the transfer counseling orchestrator
//!
//! This crate covers:
//! - Routing, guardrail, and merge scenarios end to end
//! - Circuit breaker and timeout behavior through the coordinator
//! - Session ordering, persistence, and storage degradation
//! - The OpenAI provider against a mock server
//! - Trace file and metrics output

pub mod fixtures;
pub mod mock_providers;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_providers::*;

#[cfg(test)]
mod breaker_tests;
#[cfg(test)]
mod provider_tests;
#[cfg(test)]
mod scenario_tests;
#[cfg(test)]
mod session_tests;
#[cfg(test)]
mod telemetry_tests;
