//! Runtime configuration.
//!
//! Loaded from YAML. Every section has defaults, so an absent file or an
//! empty document yields a working configuration. Durations are written
//! the humantime way (`"1s"`, `"500ms"`, `"2m"`).
//!
//! ```yaml
//! retry:
//!   max_retries: 6
//!   initial_delay: 1s
//!   max_delay: 60s
//!   backoff_multiplier: 2.0
//!   jitter: true
//! completion:
//!   model: gpt-4o-mini
//!   max_tokens: 2000
//!   temperature: 0.1
//!   timeout: 60s
//! follow_ups:
//!   enabled: true
//!   count: 3
//! provider:
//!   type: openai
//!   base_url: https://api.openai.com/v1
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::providers::CompletionConfig;
use crate::resilience::RetryPolicy;

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Follow-up question generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpConfig {
    pub enabled: bool,
    /// Maximum number of questions kept
    pub count: usize,
}

impl Default for FollowUpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 3,
        }
    }
}

/// Which provider to build, plus its provider-specific options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(rename = "type", default = "default_provider_type")]
    pub kind: String,

    /// Passed verbatim to the provider factory.
    #[serde(flatten)]
    pub options: Map<String, JsonValue>,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: default_provider_type(),
            options: Map::new(),
        }
    }
}

impl ProviderSettings {
    /// Options as a JSON object, ready for a factory.
    pub fn options_json(&self) -> JsonValue {
        JsonValue::Object(self.options.clone())
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub retry: RetryPolicy,
    pub completion: CompletionConfig,
    pub follow_ups: FollowUpConfig,
    pub provider: ProviderSettings,
}

impl RuntimeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = if yaml.trim().is_empty() {
            RuntimeConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(yaml) => Self::from_yaml_str(&yaml),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        if self.completion.model.trim().is_empty() {
            return Err(ConfigError::Invalid("completion.model must not be empty".into()));
        }
        if self.completion.max_tokens == 0 {
            return Err(ConfigError::Invalid("completion.max_tokens must be positive".into()));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::Invalid(
                "completion.temperature must be between 0 and 2".into(),
            ));
        }
        if self.provider.kind.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.type must not be empty".into()));
        }
        Ok(())
    }
}

/// Serde adapter for `Duration` fields written as humantime strings.
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_document_is_default() {
        let config = RuntimeConfig::from_yaml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.provider.kind, "openai");
        assert!(config.follow_ups.enabled);
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config = RuntimeConfig::from_yaml_str(
            "retry:\n  max_retries: 2\n  initial_delay: 250ms\nfollow_ups:\n  enabled: false\n",
        )
        .unwrap();
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_secs(60));
        assert!(!config.follow_ups.enabled);
        assert_eq!(config.follow_ups.count, 3);
    }

    #[test]
    fn test_provider_options_are_flattened() {
        let config = RuntimeConfig::from_yaml_str(
            "provider:\n  type: openai\n  base_url: http://localhost:8000/v1\n",
        )
        .unwrap();
        assert_eq!(
            config.provider.options_json()["base_url"],
            "http://localhost:8000/v1"
        );
        assert!(config.provider.options_json().get("type").is_none());
    }

    #[test]
    fn test_invalid_retry_policy_is_rejected() {
        let result = RuntimeConfig::from_yaml_str("retry:\n  backoff_multiplier: 1.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_duration_is_a_parse_error() {
        let result = RuntimeConfig::from_yaml_str("completion:\n  timeout: forever\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quanta.yaml");
        std::fs::write(&path, "completion:\n  model: gpt-4o\n  timeout: 30s\n").unwrap();
        let config = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.timeout, Duration::from_secs(30));
    }
}
