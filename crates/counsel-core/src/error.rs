//! Error taxonomy for the orchestrator.
//!
//! Only [`OrchestratorError`] ever reaches a caller of the coordinator.
//! [`ProviderError`] is absorbed by the circuit breaker and fallback path,
//! [`StorageError`] is absorbed by the session store, and [`ConfigError`]
//! is raised while assembling the system at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type returned by the coordinator
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Failure reported by the external AI provider.
///
/// Every variant counts as a breaker failure.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderError {
    /// The call did not complete within the caller-supplied timeout
    #[error("Provider call timed out after {after_ms}ms")]
    Timeout {
        /// Timeout that elapsed, in milliseconds
        after_ms: u64,
    },

    /// The provider rejected the call because of rate limiting
    #[error("Provider rate limit exceeded")]
    RateLimited {
        /// Suggested wait before retrying, if the provider sent one
        retry_after_secs: Option<u64>,
    },

    /// The provider rejected the credentials
    #[error("Provider authentication failed: {message}")]
    AuthFailure {
        /// Provider supplied detail
        message: String,
    },

    /// Any other failure (transport, server error, malformed response)
    #[error("Provider error: {message}")]
    Unknown {
        /// Error detail
        message: String,
    },
}

impl ProviderError {
    /// Create a timeout error
    #[must_use]
    pub fn timeout(after_ms: u64) -> Self {
        Self::Timeout { after_ms }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthFailure {
            message: message.into(),
        }
    }

    /// Create an unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Coarse classification of the error
    #[must_use]
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Timeout { .. } => ProviderErrorKind::Timeout,
            Self::RateLimited { .. } => ProviderErrorKind::RateLimited,
            Self::AuthFailure { .. } => ProviderErrorKind::AuthFailure,
            Self::Unknown { .. } => ProviderErrorKind::Unknown,
        }
    }
}

/// Coarse provider failure classification recorded on turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Call timed out
    Timeout,
    /// Provider rate limited the call
    RateLimited,
    /// Credentials rejected
    AuthFailure,
    /// Anything else
    Unknown,
    /// The breaker refused the call, the provider was not contacted
    CircuitOpen,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::AuthFailure => write!(f, "auth_failure"),
            Self::Unknown => write!(f, "unknown"),
            Self::CircuitOpen => write!(f, "circuit_open"),
        }
    }
}

/// Session persistence failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Could not reach the storage engine
    #[error("Storage connection error: {0}")]
    Connection(String),

    /// A statement failed
    #[error("Storage query error: {0}")]
    Query(String),

    /// Stored data could not be encoded or decoded
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a query error
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Invalid or unreadable configuration. Fatal at startup only.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation
    #[error("Invalid configuration for '{field}': {message}")]
    Invalid {
        /// Offending field path
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// The configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed
    #[error("Failed to parse configuration file {path}: {message}")]
    Parse {
        /// File that was parsed
        path: PathBuf,
        /// Parser message
        message: String,
    },
}

impl ConfigError {
    /// Create a validation error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors the coordinator may surface to its caller
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The system was assembled from invalid configuration
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// A programming-contract violation inside the orchestrator
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the violated invariant
        message: String,
    },
}

impl OrchestratorError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable error code for structured output
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}
