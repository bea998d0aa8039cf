//! Configuration for garden-cloud-relay

use std::time::Duration;

use garden_cloud_stream::StreamConfig;
use serde::{Deserialize, Serialize};

/// Main relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Ingestion endpoint
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Stream tuning
    #[serde(default)]
    pub stream: StreamConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ingestion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// gRPC endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer token sent with every call
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-attempt connect timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            auth_token: None,
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl CloudConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_endpoint() -> String {
    "http://127.0.0.1:50061".to_string()
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RelayConfig {
    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError>
    {
        Ok(config::Config::builder()
            .add_source(config::Config::try_from(&RelayConfig::default())?))
    }

    fn environment() -> config::Environment {
        // GARDEN_CLOUD_CLOUD__ENDPOINT, GARDEN_CLOUD_STREAM__DRAIN_TIMEOUT_MS, ...
        config::Environment::with_prefix("GARDEN_CLOUD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Load configuration: defaults, then the optional file, then
    /// `GARDEN_CLOUD_*` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Self::builder()?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garden_cloud_stream::FatalErrorPolicy;
    use garden_events::LogLevel;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.cloud.endpoint, "http://127.0.0.1:50061");
        assert!(config.cloud.auth_token.is_none());
        assert_eq!(config.cloud.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.stream.drain_timeout_ms, 5000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config: RelayConfig = RelayConfig::builder()
            .unwrap()
            .add_source(config::File::from_str(
                r#"
                [cloud]
                endpoint = "https://ingest.example.com"
                auth_token = "token"

                [stream]
                drain_timeout_ms = 250
                max_buffered_events = 1000
                fatal_errors = "escalate"
                log_level = "debug"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.cloud.endpoint, "https://ingest.example.com");
        assert_eq!(config.cloud.auth_token.as_deref(), Some("token"));
        assert_eq!(config.cloud.connect_timeout_ms, 10_000);
        assert_eq!(config.stream.drain_timeout_ms, 250);
        assert_eq!(config.stream.reconnect_backoff_ms, 1000);
        assert_eq!(config.stream.max_buffered_events, Some(1000));
        assert_eq!(config.stream.fatal_errors, FatalErrorPolicy::Escalate);
        assert_eq!(config.stream.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let config = RelayConfig::load(Some("/nonexistent/garden-cloud-relay")).unwrap();
        assert_eq!(config.stream.reconnect_backoff_ms, 1000);
    }
}
