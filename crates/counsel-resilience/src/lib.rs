//! # Counsel Resilience
//!
//! Resilience patterns for provider calls:
//! - Circuit breaker with permit-based admission and a single half-open trial
//! - Per-endpoint breaker registry
//! - Retry with exponential backoff for transient errors
//! - Timeout management

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod registry;
pub mod retry;
pub mod timeout;

// Re-export main types
pub use circuit_breaker::{
    BreakerPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
};
pub use registry::BreakerRegistry;
pub use retry::{RetryConfig, RetryPolicy};
pub use timeout::with_timeout;
