//! dl-protocol: Wire protocol for the devlink status/log channel
//!
//! The device exposes a single WebSocket endpoint on a fixed port. Both
//! directions carry JSON objects: inbound messages are discriminated by a
//! `type` field, outbound commands by a `cmd` field.

pub mod close;
pub mod command;
pub mod error;
pub mod message;

pub use close::{CloseCode, WEBSOCKET_PORT};
pub use command::OutboundCommand;
pub use error::ProtocolError;
pub use message::{FaultRecord, InboundMessage, LogEntry, StatusUpdate};
