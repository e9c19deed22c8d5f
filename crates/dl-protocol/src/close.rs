//! WebSocket close codes and the fixed service port

use std::fmt;

/// Port the device's WebSocket server listens on.
pub const WEBSOCKET_PORT: u16 = 81;

/// Close code reported when a connection ends.
///
/// Only [`CloseCode::NORMAL`] means the peer intended the connection to go
/// away; every other value is treated as a failure worth reconnecting over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure (1000)
    pub const NORMAL: Self = Self(1000);
    /// Endpoint going away (1001)
    pub const GOING_AWAY: Self = Self(1001);
    /// Close frame without a status code (1005)
    pub const NO_STATUS: Self = Self(1005);
    /// Connection dropped without a close frame (1006)
    pub const ABNORMAL: Self = Self(1006);

    /// Whether this is the normal-closure code
    pub fn is_normal(&self) -> bool {
        *self == Self::NORMAL
    }

    /// Raw numeric value
    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
