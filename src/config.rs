//! Server configuration
//!
//! Defaults, then an optional YAML file, then environment variables.

use crate::sampling::{SamplingConfig, DEFAULT_SAMPLE_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_ADDRESS: &str = "GRAPHCAT_ADDRESS";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DATA: &str = "GRAPHCAT_DATA";
pub const ENV_CORS_ORIGIN: &str = "GRAPHCAT_CORS_ORIGIN";
pub const ENV_SAMPLE_TIMEOUT_MS: &str = "GRAPHCAT_SAMPLE_TIMEOUT_MS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub address: String,
    /// Port
    pub port: u16,
    /// Data directory for persistence (None = in-memory only)
    pub data_path: Option<String>,
    /// Allowed CORS origin; `*` allows any
    pub cors_origin: String,
    /// Upper bound on one sampling call
    pub sample_timeout_ms: u64,
    /// Sample size when a request omits it
    pub default_sample_size: i64,
    pub sampling: SamplingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 5001,
            data_path: None,
            cors_origin: "http://localhost:3000".to_string(),
            sample_timeout_ms: 30_000,
            default_sample_size: DEFAULT_SAMPLE_SIZE,
            sampling: SamplingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional YAML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Override fields from `lookup` (normally the process environment)
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(ENV_ADDRESS) {
            self.address = address;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: ENV_PORT, value: port })?;
        }
        if let Some(data) = lookup(ENV_DATA) {
            self.data_path = if data.is_empty() { None } else { Some(data) };
        }
        if let Some(origin) = lookup(ENV_CORS_ORIGIN) {
            self.cors_origin = origin;
        }
        if let Some(timeout) = lookup(ENV_SAMPLE_TIMEOUT_MS) {
            self.sample_timeout_ms = timeout.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_SAMPLE_TIMEOUT_MS,
                value: timeout,
            })?;
        }
        debug!("Effective configuration: {:?}", self);
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5001);
        assert_eq!(config.cors_origin, "http://localhost:3000");
        assert_eq!(config.default_sample_size, 100);
        assert_eq!(config.sample_timeout(), Duration::from_secs(30));
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_partial_yaml() {
        let config = ServerConfig::from_yaml("port: 8080\nsampling:\n  bins: 5\n").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.sampling.bins, Some(5));
        assert_eq!(config.sampling.max_iterations, 100);
        assert_eq!(config.address, "0.0.0.0");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(ServerConfig::from_yaml("port: [1, 2]"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config
            .apply_env(env(&[(ENV_PORT, "7000"), (ENV_DATA, "/tmp/catalog"), (ENV_CORS_ORIGIN, "*")]))
            .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.data_path.as_deref(), Some("/tmp/catalog"));
        assert_eq!(config.cors_origin, "*");
        assert_eq!(config.bind_addr(), "0.0.0.0:7000");
    }

    #[test]
    fn test_bad_env_port() {
        let mut config = ServerConfig::default();
        let err = config.apply_env(env(&[(ENV_PORT, "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: ENV_PORT, .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServerConfig::load(Some(Path::new("/nonexistent/graphcat.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
