//! Client configuration, read from the environment (and `.env` when present).

use serde::{Deserialize, Serialize};

pub const ENV_BACKEND_URL: &str = "PROMPTVAULT_BACKEND_URL";
pub const ENV_BACKEND_ANON_KEY: &str = "PROMPTVAULT_BACKEND_ANON_KEY";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "PROMPTVAULT_REQUEST_TIMEOUT_MS";
pub const ENV_DEBOUNCE_MS: &str = "PROMPTVAULT_DEBOUNCE_MS";
pub const ENV_THROTTLE_MS: &str = "PROMPTVAULT_THROTTLE_MS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend_url: String,
    pub anon_key: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_throttle_ms() -> u64 {
    300
}

impl AppConfig {
    pub fn new(backend_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            backend_url: normalize_url(&backend_url.into()),
            anon_key: anon_key.into(),
            request_timeout_ms: default_request_timeout_ms(),
            debounce_ms: default_debounce_ms(),
            throttle_ms: default_throttle_ms(),
        }
    }

    /// Load from process environment after applying a `.env` file, if any.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {}", path.display());
        }
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(key).map(|value| value.trim().to_string()) {
                None => Ok(default),
                Some(value) if value.is_empty() => Ok(default),
                Some(value) => value
                    .parse::<u64>()
                    .ok()
                    .filter(|parsed| *parsed > 0)
                    .ok_or(ConfigError::Invalid { key, value }),
            }
        };

        Ok(Self {
            backend_url: normalize_url(&required(ENV_BACKEND_URL)?),
            anon_key: required(ENV_BACKEND_ANON_KEY)?,
            request_timeout_ms: number(ENV_REQUEST_TIMEOUT_MS, default_request_timeout_ms())?,
            debounce_ms: number(ENV_DEBOUNCE_MS, default_debounce_ms())?,
            throttle_ms: number(ENV_THROTTLE_MS, default_throttle_ms())?,
        })
    }
}

fn normalize_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn loads_required_settings_and_defaults() {
        let config = AppConfig::from_source(lookup(&[
            (ENV_BACKEND_URL, " https://db.example.co/ "),
            (ENV_BACKEND_ANON_KEY, "anon"),
        ]))
        .unwrap();

        assert_eq!(config, AppConfig::new("https://db.example.co", "anon"));
        assert_eq!(config.request_timeout_ms, 10_000);
    }

    #[test]
    fn overrides_numeric_settings() {
        let config = AppConfig::from_source(lookup(&[
            (ENV_BACKEND_URL, "http://localhost:54321"),
            (ENV_BACKEND_ANON_KEY, "anon"),
            (ENV_DEBOUNCE_MS, "150"),
            (ENV_THROTTLE_MS, ""),
        ]))
        .unwrap();

        assert_eq!(config.debounce_ms, 150);
        assert_eq!(config.throttle_ms, 300);
    }

    #[test]
    fn missing_url_is_reported() {
        let error = AppConfig::from_source(lookup(&[(ENV_BACKEND_ANON_KEY, "anon")])).unwrap_err();
        assert_eq!(error, ConfigError::Missing(ENV_BACKEND_URL));
    }

    #[test]
    fn invalid_number_is_reported() {
        let error = AppConfig::from_source(lookup(&[
            (ENV_BACKEND_URL, "http://localhost"),
            (ENV_BACKEND_ANON_KEY, "anon"),
            (ENV_REQUEST_TIMEOUT_MS, "soon"),
        ]))
        .unwrap_err();
        assert_eq!(
            error,
            ConfigError::Invalid {
                key: ENV_REQUEST_TIMEOUT_MS,
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"backend_url":"http://x","anon_key":"k"}"#).unwrap();
        assert_eq!(config.debounce_ms, 300);
    }
}
