//! Outbound commands (client → device)
//!
//! Every command is a JSON object with a `cmd` field naming the operation;
//! any further keys are operation parameters and are flattened next to it:
//!
//! ```json
//! {"cmd": "auth", "token": "session_1718000000000"}
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

/// Authenticate the connection (`token` parameter)
pub const CMD_AUTH: &str = "auth";
/// Request the most recent log entries
pub const CMD_GET_LOGS: &str = "get_logs";
/// Request a status snapshot
pub const CMD_GET_STATUS: &str = "get_status";
/// Keep-alive; answered with a `pong` message
pub const CMD_PING: &str = "ping";

/// A command envelope with free-form parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundCommand {
    cmd: String,
    #[serde(flatten)]
    params: Map<String, Value>,
}

impl OutboundCommand {
    /// Create a command with no parameters
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter. A `cmd` key is ignored so the envelope name cannot be
    /// overwritten.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "cmd" {
            self.params.insert(key, value.into());
        }
        self
    }

    /// `auth` carrying a session token
    pub fn auth(token: impl Into<String>) -> Self {
        Self::new(CMD_AUTH).with("token", token.into())
    }

    /// `get_logs`
    pub fn get_logs() -> Self {
        Self::new(CMD_GET_LOGS)
    }

    /// `get_status`
    pub fn get_status() -> Self {
        Self::new(CMD_GET_STATUS)
    }

    /// `ping`
    pub fn ping() -> Self {
        Self::new(CMD_PING)
    }

    /// Command name
    pub fn name(&self) -> &str {
        &self.cmd
    }

    /// Look up a parameter
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Serialize to the JSON text sent on the wire
    pub fn encode(&self) -> String {
        // A String key plus a map of Values always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| format!(r#"{{"cmd":{:?}}}"#, self.cmd))
    }
}
