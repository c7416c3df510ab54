//! Per-endpoint breaker registry.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
use counsel_core::ConfigError;
use dashmap::DashMap;
use std::sync::Arc;

/// Owns one circuit breaker per provider endpoint, created on first use
#[derive(Debug)]
pub struct BreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Create a registry sharing one validated configuration
    pub fn new(config: CircuitBreakerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            breakers: DashMap::new(),
        })
    }

    /// Shared configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Breaker for an endpoint, creating it in the closed state if needed
    pub fn get(&self, endpoint: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(endpoint) {
            return Arc::clone(existing.value());
        }
        let entry = self.breakers.entry(endpoint.to_string()).or_insert_with(|| {
            Arc::new(CircuitBreaker::from_validated(endpoint, self.config.clone()))
        });
        Arc::clone(entry.value())
    }

    /// Current state of an endpoint; unknown endpoints are closed
    pub fn state(&self, endpoint: &str) -> CircuitState {
        self.breakers
            .get(endpoint)
            .map_or(CircuitState::Closed, |b| b.state())
    }

    /// Statistics for every known endpoint, sorted by endpoint
    pub fn stats(&self) -> Vec<CircuitBreakerStats> {
        let mut stats: Vec<_> = self.breakers.iter().map(|b| b.stats()).collect();
        stats.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        stats
    }

    /// Reset every breaker to closed
    pub fn reset_all(&self) {
        for breaker in &self.breakers {
            breaker.reset();
        }
    }

    /// Number of endpoints seen
    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    /// Whether no endpoint has been seen
    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self {
            config: CircuitBreakerConfig::default(),
            breakers: DashMap::new(),
        }
    }
}
