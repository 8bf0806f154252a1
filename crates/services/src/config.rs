use std::env;
use std::path::Path;

use course_core::model::{GateOptions, GatePolicy};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

pub const PROGRESS_URL_ENV: &str = "COURSE_PROGRESS_URL";
pub const PROGRESS_API_KEY_ENV: &str = "COURSE_PROGRESS_API_KEY";

/// Connection settings for the remote course-progress service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressServiceConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl ProgressServiceConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Build from `COURSE_PROGRESS_URL` / `COURSE_PROGRESS_API_KEY`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var(PROGRESS_URL_ENV).ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_key = env::var(PROGRESS_API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        Some(Self {
            base_url: base_url.trim().to_string(),
            api_key,
            timeout_secs: default_timeout_secs(),
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(ConfigError::InvalidBaseUrl(self.base_url.clone())),
        }
    }
}

/// Engine configuration, usually read from a TOML file:
///
/// ```toml
/// [gate]
/// lesson_completion_mode = "correct"
/// scenario_unlock_threshold = 0.8
///
/// [progress_service]
/// base_url = "https://progress.example.com/api"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub gate: GateOptions,
    #[serde(default)]
    pub progress_service: Option<ProgressServiceConfig>,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on malformed TOML, an invalid gate threshold or an
    /// unusable progress service URL.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Let the environment supply or replace the progress service settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if the environment URL is unusable.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(from_env) = ProgressServiceConfig::from_env() {
            from_env.validate()?;
            self.progress_service = Some(from_env);
        }
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Gate` if the gate options do not resolve.
    pub fn gate_policy(&self) -> Result<GatePolicy, ConfigError> {
        Ok(self.gate.resolve()?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.gate.resolve()?;
        if let Some(service) = &self.progress_service {
            service.validate()?;
        }
        Ok(())
    }
}
