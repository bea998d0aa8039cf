//! Configuration for the cloud event stream

use std::time::Duration;

use garden_events::LogLevel;
use serde::{Deserialize, Serialize};

/// What the reconnect loop does with an error it cannot retry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FatalErrorPolicy {
    /// Log and stop streaming for the rest of the process.
    #[default]
    BailOut,
    /// Stop streaming and surface the error through `wait()`.
    Escalate,
}

/// Stream tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Delay between connection attempts
    #[serde(default = "default_reconnect_backoff")]
    pub reconnect_backoff_ms: u64,

    /// Upper bound on how long `close()` waits for outstanding acknowledgements
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_ms: u64,

    /// Evict the oldest unacknowledged event beyond this many (None = unbounded)
    #[serde(default)]
    pub max_buffered_events: Option<usize>,

    /// Keep at most this many session id mappings (None = unbounded)
    #[serde(default)]
    pub session_cache_capacity: Option<usize>,

    /// Handling of non-transport errors
    #[serde(default)]
    pub fatal_errors: FatalErrorPolicy,

    /// Least severe log level forwarded to the cloud
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff_ms: default_reconnect_backoff(),
            drain_timeout_ms: default_drain_timeout(),
            max_buffered_events: None,
            session_cache_capacity: None,
            fatal_errors: FatalErrorPolicy::BailOut,
            log_level: LogLevel::Info,
        }
    }
}

impl StreamConfig {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

fn default_reconnect_backoff() -> u64 {
    1000
}

fn default_drain_timeout() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.reconnect_backoff(), Duration::from_secs(1));
        assert_eq!(config.drain_timeout(), Duration::from_secs(5));
        assert!(config.max_buffered_events.is_none());
        assert_eq!(config.fatal_errors, FatalErrorPolicy::BailOut);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: StreamConfig =
            serde_json::from_str(r#"{"drain_timeout_ms": 250, "fatal_errors": "escalate"}"#)
                .unwrap();
        assert_eq!(config.drain_timeout_ms, 250);
        assert_eq!(config.reconnect_backoff_ms, 1000);
        assert_eq!(config.fatal_errors, FatalErrorPolicy::Escalate);
        assert_eq!(config.log_level, LogLevel::Info);
    }
}
