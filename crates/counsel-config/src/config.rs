//! Top-level configuration.

use crate::agents::AgentSettings;
use crate::guardrail::GuardrailSettings;
use counsel_core::{ConfigError, ProfileRegistry};
use counsel_resilience::{CircuitBreakerConfig, RetryConfig};
use counsel_routing::RouterConfig;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Which provider answers agent calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions API
    #[default]
    OpenAi,
    /// No network calls; every agent is served by fallback
    Offline,
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "offline" => Ok(Self::Offline),
            other => Err(ConfigError::invalid(
                "provider.kind",
                format!("unknown provider '{other}' (expected openai or offline)"),
            )),
        }
    }
}

/// Provider settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider kind
    pub kind: ProviderKind,
    /// Base URL without the `/v1` suffix
    #[validate(url)]
    pub base_url: String,
    /// Chat model
    #[validate(length(min = 1))]
    pub model: String,
    /// API key; usually taken from `api_key_env`
    #[serde(skip_serializing)]
    pub api_key: Option<SecretString>,
    /// Environment variable holding the API key
    #[validate(length(min = 1))]
    pub api_key_env: String,
    /// Sampling temperature
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f32>,
    /// Completion token cap
    #[validate(range(min = 1))]
    pub max_tokens: Option<u32>,
    /// Bound on each provider call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(1024),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionSettings {
    /// Persist sessions to the database
    pub persistence: bool,
    /// SQLite URL
    #[validate(length(min = 1))]
    pub database_url: String,
    /// Pool size
    #[validate(range(min = 1, max = 64))]
    pub max_connections: u32,
    /// Turns of history sent to the provider
    #[validate(range(max = 100))]
    pub history_limit: usize,
    /// Idle time after which `sessions cleanup` removes a session
    #[serde(with = "humantime_serde")]
    pub cleanup_after: Duration,
    /// Record guardrail-blocked queries as turns
    pub record_blocked_turns: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            persistence: true,
            database_url: "sqlite://sessions.db".to_string(),
            max_connections: 5,
            history_limit: 10,
            cleanup_after: Duration::from_secs(24 * 60 * 60),
            record_blocked_turns: true,
        }
    }
}

/// Telemetry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Log level or filter directive
    pub log_level: String,
    /// Emit JSON logs
    pub json_logs: bool,
    /// Append trace events to `trace_file`
    pub enable_trace_file: bool,
    /// JSON lines trace file
    pub trace_file: PathBuf,
    /// Attach the OpenTelemetry layer
    pub otel: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
            enable_trace_file: true,
            trace_file: PathBuf::from("logs/agent_trace.jsonl"),
            otel: false,
        }
    }
}

/// Complete orchestrator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CounselConfig {
    /// Routing thresholds
    pub router: RouterConfig,
    /// Circuit breaker thresholds
    pub breaker: CircuitBreakerConfig,
    /// Backoff for transient provider errors
    pub retry: RetryConfig,
    /// Provider settings
    #[validate(nested)]
    pub provider: ProviderSettings,
    /// Session settings
    #[validate(nested)]
    pub session: SessionSettings,
    /// Telemetry settings
    pub telemetry: TelemetrySettings,
    /// Guardrail lists and messages
    pub guardrail: GuardrailSettings,
    /// Agent roster
    pub agents: AgentSettings,
}

impl CounselConfig {
    /// Run field-level and cross-section validation
    ///
    /// # Errors
    /// Returns the first `ConfigError::Invalid` found
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        if let Err(errors) = self.validate() {
            return Err(to_config_error(&errors));
        }
        if self.provider.timeout.is_zero() {
            return Err(ConfigError::invalid("provider.timeout", "must be greater than zero"));
        }
        if self.telemetry.enable_trace_file && self.telemetry.trace_file.as_os_str().is_empty() {
            return Err(ConfigError::invalid("telemetry.trace_file", "must not be empty"));
        }
        self.router.validate()?;
        self.breaker.validate()?;
        self.retry.validate()?;
        self.guardrail.validate()?;
        self.agents.build_registry()?;
        Ok(())
    }

    /// Build the agent registry
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the roster is inconsistent
    pub fn build_registry(&self) -> Result<ProfileRegistry, ConfigError> {
        self.agents.build_registry()
    }

    /// Whether agent calls go out to a provider
    #[must_use]
    pub fn uses_network(&self) -> bool {
        self.provider.kind == ProviderKind::OpenAi && self.provider.api_key.is_some()
    }

    /// JSON view with the API key redacted
    ///
    /// # Errors
    /// Returns error if a section fails to serialize
    pub fn redacted(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(provider) = value.get_mut("provider").and_then(|p| p.as_object_mut()) {
            let shown = if self.provider.api_key.is_some() { "[REDACTED]" } else { "[unset]" };
            provider.insert("api_key".to_string(), serde_json::Value::from(shown));
        }
        Ok(value)
    }
}

fn to_config_error(errors: &ValidationErrors) -> ConfigError {
    first_error("", errors).map_or_else(
        || ConfigError::invalid("config", errors.to_string()),
        |(field, message)| ConfigError::invalid(field, message),
    )
}

fn first_error(prefix: &str, errors: &ValidationErrors) -> Option<(String, String)> {
    let mut keys: Vec<&Cow<'static, str>> = errors.errors().keys().collect();
    keys.sort();

    for key in keys {
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        match errors.errors().get(key) {
            Some(ValidationErrorsKind::Field(list)) => {
                if let Some(err) = list.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map_or_else(|| format!("failed '{}' check", err.code), ToString::to_string);
                    return Some((path, message));
                }
            }
            Some(ValidationErrorsKind::Struct(inner)) => {
                if let Some(found) = first_error(&path, inner) {
                    return Some(found);
                }
            }
            Some(ValidationErrorsKind::List(items)) => {
                for (index, inner) in items {
                    if let Some(found) = first_error(&format!("{path}[{index}]"), inner) {
                        return Some(found);
                    }
                }
            }
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults_are_valid() {
        let config = CounselConfig::default();
        config.ensure_valid().unwrap();
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.session.history_limit, 10);
        assert!(!config.uses_network());
    }

    #[test]
    fn test_field_errors_name_the_path() {
        let mut config = CounselConfig::default();
        config.session.max_connections = 0;
        match config.ensure_valid() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "session.max_connections"),
            other => panic!("unexpected: {other:?}"),
        }

        let mut config = CounselConfig::default();
        config.provider.base_url = "not a url".to_string();
        match config.ensure_valid() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "provider.base_url"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_semantic_errors() {
        let mut config = CounselConfig::default();
        config.breaker.failure_threshold = 0;
        assert!(config.ensure_valid().is_err());

        let mut config = CounselConfig::default();
        config.router.epsilon = -1.0;
        assert!(config.ensure_valid().is_err());

        let mut config = CounselConfig::default();
        config.provider.timeout = Duration::ZERO;
        assert!(config.ensure_valid().is_err());

        let mut config = CounselConfig::default();
        config.retry.max_attempts = 0;
        match config.ensure_valid() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "retry.max_attempts"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_redacted_hides_key() {
        let mut config = CounselConfig::default();
        config.provider.api_key = Some(SecretString::new("sk-secret".to_string()));
        assert!(config.uses_network());

        let value = config.redacted().unwrap();
        assert_eq!(value["provider"]["api_key"], "[REDACTED]");
        assert!(!value.to_string().contains("sk-secret"));
        assert_eq!(
            config.provider.api_key.as_ref().unwrap().expose_secret(),
            "sk-secret"
        );
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("offline".parse::<ProviderKind>().unwrap(), ProviderKind::Offline);
        assert!("anthropic".parse::<ProviderKind>().is_err());
    }
}
