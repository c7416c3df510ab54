//! Agent profiles and the profile registry.
//!
//! A profile is plain data: the keywords an agent answers to, a priority
//! rank for tie-breaks, and a label used when responses are merged.

use crate::error::ConfigError;
use crate::types::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_weight() -> f64 {
    1.0
}

/// A capability keyword or phrase with its routing weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    /// Word or multi-word phrase
    pub phrase: String,
    /// Weight added to the agent's score when the phrase matches
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Keyword {
    /// Create a keyword with an explicit weight
    pub fn new(phrase: impl Into<String>, weight: f64) -> Self {
        Self {
            phrase: phrase.into(),
            weight,
        }
    }
}

/// Static description of one responder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Agent identifier
    pub id: AgentId,
    /// Human-readable label (used for merged response sections)
    pub label: String,
    /// Tie-break rank, lower wins
    #[serde(default)]
    pub priority: u32,
    /// Ordered capability keywords
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    /// Provider endpoint name used as the circuit breaker key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Instructions sent to the provider as the system message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl AgentProfile {
    /// Create a profile with no keywords
    pub fn new(id: impl Into<AgentId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            priority: 0,
            keywords: Vec::new(),
            endpoint: None,
            instructions: None,
        }
    }

    /// Set the priority rank
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a single keyword
    #[must_use]
    pub fn with_keyword(mut self, phrase: impl Into<String>, weight: f64) -> Self {
        self.keywords.push(Keyword::new(phrase, weight));
        self
    }

    /// Add several keywords sharing one weight
    #[must_use]
    pub fn with_keywords<I, S>(mut self, phrases: I, weight: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords
            .extend(phrases.into_iter().map(|p| Keyword::new(p, weight)));
        self
    }

    /// Set the provider endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set provider instructions
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Circuit breaker key for this agent; defaults to the agent id
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

/// Immutable set of agent profiles plus the designated general agent
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<AgentProfile>,
    general: AgentId,
}

impl ProfileRegistry {
    /// Build a registry, validating the profile set.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the set is empty, an id is empty or
    /// duplicated, a weight is negative or not finite, or the general agent
    /// is missing.
    pub fn new(profiles: Vec<AgentProfile>, general: impl Into<AgentId>) -> Result<Self, ConfigError> {
        let general = general.into();

        if profiles.is_empty() {
            return Err(ConfigError::invalid("agents", "at least one agent profile is required"));
        }

        let mut seen = HashSet::new();
        for profile in &profiles {
            if profile.id.is_empty() {
                return Err(ConfigError::invalid("agents.id", "agent id must not be empty"));
            }
            if !seen.insert(profile.id.clone()) {
                return Err(ConfigError::invalid(
                    "agents.id",
                    format!("duplicate agent id '{}'", profile.id),
                ));
            }
            for keyword in &profile.keywords {
                if keyword.phrase.trim().is_empty() {
                    return Err(ConfigError::invalid(
                        format!("agents.{}.keywords", profile.id),
                        "keyword phrase must not be empty",
                    ));
                }
                if !keyword.weight.is_finite() || keyword.weight < 0.0 {
                    return Err(ConfigError::invalid(
                        format!("agents.{}.keywords", profile.id),
                        format!("weight for '{}' must be finite and non-negative", keyword.phrase),
                    ));
                }
            }
        }

        if !seen.contains(&general) {
            return Err(ConfigError::invalid(
                "router.general_agent",
                format!("general agent '{general}' is not a configured agent"),
            ));
        }

        Ok(Self { profiles, general })
    }

    /// Look up a profile by id
    #[must_use]
    pub fn get(&self, id: &AgentId) -> Option<&AgentProfile> {
        self.profiles.iter().find(|p| &p.id == id)
    }

    /// All profiles in configuration order
    #[must_use]
    pub fn profiles(&self) -> &[AgentProfile] {
        &self.profiles
    }

    /// The agent that answers when nothing matches
    #[must_use]
    pub fn general_agent(&self) -> &AgentId {
        &self.general
    }

    /// Number of profiles
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the registry is empty (never true for a constructed registry)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Label for an agent, falling back to its title-cased id
    #[must_use]
    pub fn label_for(&self, id: &AgentId) -> String {
        self.get(id)
            .map_or_else(|| id.title_case(), |p| p.label.clone())
    }
}
