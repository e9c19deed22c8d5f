//! dl-client: Real-time connection manager for a device's status/log service
//!
//! Keeps one WebSocket connection to the device, authenticates it, routes
//! inbound messages to registered consumers, and recovers from disconnects
//! with bounded, backoff-delayed retries.
//!
//! The [`manager::ConnectionManager`] is a plain state machine driven by
//! transport events and timer expiries; [`driver::Driver`] hosts it on tokio
//! with a real WebSocket transport.

pub mod backoff;
pub mod commands;
pub mod consumers;
pub mod dispatch;
pub mod driver;
pub mod manager;
pub mod output;
pub mod state;

pub use backoff::BackoffPolicy;
pub use consumers::{LogView, StatusBoard};
pub use dispatch::{Dispatcher, Route};
pub use driver::{ClientHandle, Driver, RunOutcome};
pub use manager::ConnectionManager;
pub use state::{ConnectionPhase, ConnectionState};
