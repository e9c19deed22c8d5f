//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::ConfigError;

/// Path of the page on which the connection logic must not run
pub const LOGIN_PAGE_PATH: &str = "/login.html";

/// Identifier of one transport instance.
///
/// Each connection attempt gets a fresh id so events from a superseded
/// transport can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What the UI status indicator shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    /// A connection attempt is in flight
    Connecting,
    /// The transport is open
    Connected,
    /// No transport
    Disconnected,
    /// The transport reported an error
    Error,
}

impl LinkStatus {
    /// Whether the indicator should show the "up" colour
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkStatus::Connected)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Connecting => write!(f, "connecting"),
            LinkStatus::Connected => write!(f, "connected"),
            LinkStatus::Disconnected => write!(f, "disconnected"),
            LinkStatus::Error => write!(f, "error"),
        }
    }
}

/// WebSocket endpoint of the device's status/log service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Derive the endpoint from the URL of the hosting page.
    ///
    /// The service lives on the same host as the page, on a fixed port.
    /// Returns [`ConfigError::LoginPage`] for the login page.
    pub fn from_page_url(page_url: &str, port: u16) -> Result<Self, ConfigError> {
        let page = Url::parse(page_url)?;
        if page.path() == LOGIN_PAGE_PATH {
            return Err(ConfigError::LoginPage);
        }
        let host = page
            .host_str()
            .ok_or_else(|| ConfigError::MissingHost(page_url.to_string()))?;

        let url = Url::parse(&format!("ws://{}:{}/", host, port))?;
        Ok(Self { url })
    }

    /// Full URL (`ws://host:port/`)
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Host part
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Port part
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
