//! Core error types for devlink

use dl_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the devlink crates
#[derive(Error, Debug)]
pub enum DlError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The transport could not even be started
    #[error("Failed to open transport to {endpoint}: {reason}")]
    Establish { endpoint: String, reason: String },

    /// The transport handle no longer accepts frames
    #[error("Transport closed")]
    TransportClosed,

    /// Writing a frame failed
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The driver's event loop has stopped
    #[error("Connection driver is not running")]
    DriverStopped,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Page URL could not be parsed
    #[error("Invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Page URL has no host to connect to
    #[error("Page URL has no host: {0}")]
    MissingHost(String),

    /// The connection never runs on the login page
    #[error("Refusing to connect from the login page")]
    LoginPage,
}
