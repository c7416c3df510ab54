//! Configuration loading.
//!
//! Precedence, lowest first: built-in defaults, the config file (YAML or
//! TOML by extension), environment overrides. The result is validated
//! before it is returned.

use crate::config::CounselConfig;
use counsel_core::ConfigError;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Names tried in the working directory when no path is given
pub const DEFAULT_CONFIG_FILES: &[&str] = &["counsel.yaml", "counsel.yml", "counsel.toml"];

type EnvSource = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Loads [`CounselConfig`] from file and environment
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env: EnvSource,
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader reading the process environment
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: None,
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Read this file instead of searching for one
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace the environment lookup
    #[must_use]
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(env);
        self
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|value| !value.trim().is_empty())
    }

    /// Resolve the config file: explicit path, then `COUNSEL_CONFIG`, then
    /// the first default name present in the working directory
    #[must_use]
    pub fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }
        if let Some(path) = self.var("COUNSEL_CONFIG") {
            return Some(PathBuf::from(path));
        }
        DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    }

    /// Load, apply overrides, and validate
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed, an
    /// override is malformed, or validation fails
    pub fn load(&self) -> Result<CounselConfig, ConfigError> {
        let mut config = match self.resolve_path() {
            Some(path) => {
                let config = read_file(&path)?;
                info!(path = %path.display(), "Loaded configuration file");
                config
            }
            None => {
                debug!("No configuration file found, using defaults");
                CounselConfig::default()
            }
        };

        self.apply_env_overrides(&mut config)?;
        config.ensure_valid()?;
        Ok(config)
    }

    fn apply_env_overrides(&self, config: &mut CounselConfig) -> Result<(), ConfigError> {
        if let Some(value) = self.var("COUNSEL_PROVIDER") {
            config.provider.kind = value.parse()?;
        }
        if let Some(value) = self.var(&config.provider.api_key_env) {
            config.provider.api_key = Some(SecretString::new(value));
        }
        if let Some(value) = self.var("OPENAI_BASE_URL") {
            config.provider.base_url = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = self.var("COUNSEL_PROVIDER_TIMEOUT_SECS") {
            let secs = parse_number::<u64>("COUNSEL_PROVIDER_TIMEOUT_SECS", &value)?;
            config.provider.timeout = Duration::from_secs(secs);
        }

        if let Some(value) = self.var("COUNSEL_LOG_LEVEL").or_else(|| self.var("LOG_LEVEL")) {
            config.telemetry.log_level = value.to_ascii_lowercase();
        }

        if let Some(value) = self.var("COUNSEL_SESSION_DB") {
            config.session.database_url = database_url(&value);
        }
        if let Some(value) = self.var("COUNSEL_HISTORY_LIMIT") {
            config.session.history_limit = parse_number("COUNSEL_HISTORY_LIMIT", &value)?;
        }

        Ok(())
    }
}

/// Accept either a sqlx URL or a bare file path
fn database_url(value: &str) -> String {
    if value.starts_with("sqlite:") {
        value.to_string()
    } else {
        format!("sqlite://{value}")
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::invalid(key, format!("expected a non-negative integer, got '{value}'")))
}

/// Parse a config file, choosing the format by extension
///
/// # Errors
/// Returns `ConfigError::Io` or `ConfigError::Parse`
pub fn read_file(path: &Path) -> Result<CounselConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => {
            if content.trim().is_empty() {
                return Ok(CounselConfig::default());
            }
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
        Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        other => Err(parse_error(format!(
            "unsupported extension {:?} (expected .yaml, .yml, or .toml)",
            other.unwrap_or("")
        ))),
    }
}
