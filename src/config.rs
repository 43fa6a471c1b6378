//! Configuration Management
//!
//! Resolves Linode connection settings from module parameters, the
//! environment and an optional config file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.linode.com/";
pub const DEFAULT_API_VERSION: &str = "v4beta";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 4;

/// User configuration stored at `<config_dir>/lincloud/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub ua_prefix: Option<String>,
    #[serde(default)]
    pub ca_path: Option<PathBuf>,
    /// Seconds between status polls
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

/// Connection values supplied directly by a module invocation
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub api_token: Option<String>,
    pub api_url: Option<String>,
    pub api_version: Option<String>,
    pub ua_prefix: Option<String>,
    pub ca_path: Option<PathBuf>,
}

/// Fully resolved connection settings
#[derive(Clone)]
pub struct ApiSettings {
    pub api_token: String,
    pub api_url: String,
    pub api_version: String,
    pub ua_prefix: Option<String>,
    pub ca_path: Option<PathBuf>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lincloud").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
                .max(1),
        )
    }

    /// Resolve settings using the process environment
    pub fn resolve(&self, overrides: &ConnectionOverrides) -> Result<ApiSettings> {
        self.resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve settings: parameter > environment > config file > default
    pub fn resolve_with<F>(&self, overrides: &ConnectionOverrides, env: F) -> Result<ApiSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        let api_token = non_empty(overrides.api_token.clone())
            .or_else(|| non_empty(env("LINODE_API_TOKEN")))
            .or_else(|| non_empty(env("LINODE_TOKEN")))
            .or_else(|| non_empty(self.api_token.clone()))
            .ok_or_else(|| {
                Error::Config(
                    "No API token configured. Set api_token or LINODE_API_TOKEN".to_string(),
                )
            })?;

        let api_url = non_empty(overrides.api_url.clone())
            .or_else(|| non_empty(env("LINODE_API_URL")))
            .or_else(|| non_empty(self.api_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let api_version = non_empty(overrides.api_version.clone())
            .or_else(|| non_empty(env("LINODE_API_VERSION")))
            .or_else(|| non_empty(self.api_version.clone()))
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let ua_prefix = non_empty(overrides.ua_prefix.clone())
            .or_else(|| non_empty(env("LINODE_UA_PREFIX")))
            .or_else(|| non_empty(self.ua_prefix.clone()));

        let ca_path = overrides
            .ca_path
            .clone()
            .or_else(|| non_empty(env("LINODE_CA")).map(PathBuf::from))
            .or_else(|| self.ca_path.clone());

        Ok(ApiSettings {
            api_token,
            api_url,
            api_version,
            ua_prefix,
            ca_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_token_is_set() {
        let settings = Config::default()
            .resolve_with(&ConnectionOverrides::default(), env_of(&[("LINODE_TOKEN", "abc")]))
            .unwrap();
        assert_eq!(settings.api_token, "abc");
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.api_version, DEFAULT_API_VERSION);
        assert!(settings.ua_prefix.is_none());
    }

    #[test]
    fn test_parameter_beats_env_beats_file() {
        let config = Config {
            api_token: Some("from-file".into()),
            api_version: Some("v4".into()),
            ..Default::default()
        };
        let env = env_of(&[("LINODE_API_TOKEN", "from-env"), ("LINODE_API_VERSION", "v4beta")]);

        let overrides = ConnectionOverrides {
            api_token: Some("from-param".into()),
            ..Default::default()
        };
        let settings = config.resolve_with(&overrides, &env).unwrap();
        assert_eq!(settings.api_token, "from-param");
        assert_eq!(settings.api_version, "v4beta");

        let settings = config
            .resolve_with(&ConnectionOverrides::default(), env_of(&[]))
            .unwrap();
        assert_eq!(settings.api_token, "from-file");
        assert_eq!(settings.api_version, "v4");
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let result = Config::default().resolve_with(&ConnectionOverrides::default(), env_of(&[]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_poll_interval_default_and_floor() {
        assert_eq!(Config::default().poll_interval(), Duration::from_secs(4));
        let config = Config {
            poll_interval_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
