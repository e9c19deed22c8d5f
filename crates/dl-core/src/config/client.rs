//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use dl_protocol::WEBSOCKET_PORT;

use super::serde_utils::{duration_millis, duration_secs};
use crate::error::ConfigError;
use crate::types::Endpoint;

/// Configuration for the connection manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL of the page hosting the client.
    ///
    /// Only its host is used; the service always listens on `port`.
    pub page_url: String,

    /// WebSocket port of the status/log service
    pub port: u16,

    /// Keep-alive ping period while authenticated (0 disables).
    ///
    /// The device drops authenticated clients that stay silent for 30s.
    #[serde(with = "duration_secs")]
    pub heartbeat_interval: Duration,

    /// Upper bound on a single WebSocket handshake
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Reconnect policy
    pub backoff: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_url: "http://192.168.1.100/".to_string(),
            port: WEBSOCKET_PORT,
            heartbeat_interval: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Resolve the WebSocket endpoint from `page_url` and `port`
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        Endpoint::from_page_url(&self.page_url, self.port)
    }

    /// Heartbeat period, `None` when disabled
    pub fn heartbeat(&self) -> Option<Duration> {
        (!self.heartbeat_interval.is_zero()).then_some(self.heartbeat_interval)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff.base.is_zero() {
            return Err(ConfigError::Invalid("backoff.base must be positive".into()));
        }
        if self.backoff.cap < self.backoff.base {
            return Err(ConfigError::Invalid(
                "backoff.cap must not be smaller than backoff.base".into(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid("connect_timeout must be positive".into()));
        }
        self.endpoint().map(|_| ())
    }
}

/// Exponential backoff configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Base delay, doubled per attempt
    #[serde(with = "duration_millis")]
    pub base: Duration,

    /// Maximum delay
    #[serde(with = "duration_millis")]
    pub cap: Duration,

    /// Reconnect attempts before giving up for good
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            cap: Duration::from_millis(15000),
            max_attempts: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 81);
        assert_eq!(config.backoff.base, Duration::from_secs(1));
        assert_eq!(config.backoff.cap, Duration::from_secs(15));
        assert_eq!(config.backoff.max_attempts, 5);
        assert_eq!(config.heartbeat(), Some(Duration::from_secs(10)));
        assert_eq!(config.endpoint().unwrap().as_str(), "ws://192.168.1.100:81/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_heartbeat_disables() {
        let config = ClientConfig {
            heartbeat_interval: Duration::ZERO,
            ..ClientConfig::default()
        };
        assert_eq!(config.heartbeat(), None);
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let config = ClientConfig {
            backoff: BackoffConfig {
                base: Duration::from_secs(20),
                cap: Duration::from_secs(15),
                max_attempts: 5,
            },
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_login_page() {
        let config = ClientConfig {
            page_url: "http://192.168.1.100/login.html".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::LoginPage)));
    }
}
