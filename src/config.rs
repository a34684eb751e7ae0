//! Configuration management

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream wait-times API configuration
    pub upstream: UpstreamConfig,
    /// Response cache configuration
    pub cache: CacheConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Upstream wait-times API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the wait-times service
    pub base_url: String,
    /// Request timeout for upstream calls
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Response cache configuration
///
/// The TTL is fixed per cache instance at startup; it is not runtime
/// reconfigurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a cached payload stays servable
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Period of the background sweep that removes unread expired entries
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or the upstream base URL is not a valid URL.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (WAIT_TIMES_ prefix)
        figment = figment.merge(Env::prefixed("WAIT_TIMES_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the gateway cannot serve with.
    fn validate(&self) -> Result<()> {
        Url::parse(&self.upstream.base_url).map_err(|e| {
            Error::Config(format!(
                "Invalid upstream base_url '{}': {e}",
                self.upstream.base_url
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upstream.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.cache.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn loads_yaml_file_over_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            "server:\n  port: 9090\nupstream:\n  base_url: https://waits.example.com\ncache:\n  ttl: 30s"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.upstream.base_url, "https://waits.example.com");
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
        // Untouched sections keep their defaults
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.cache.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/gateway.yaml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn invalid_upstream_url_is_rejected() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "upstream:\n  base_url: not a url").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }
}
