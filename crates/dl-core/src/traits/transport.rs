//! Transport and timer traits
//!
//! The connection manager never touches sockets or clocks directly. It opens
//! transports through a [`Connector`], talks to the live one through its
//! [`TransportHandle`], and arms its retry timer through a [`Scheduler`].
//! Whatever hosts the manager feeds the resulting [`TransportEvent`]s and
//! timer expiries back in, one at a time.

use std::time::Duration;

use dl_protocol::CloseCode;

use crate::error::ConnectionError;
use crate::types::{ConnectionId, Endpoint};

/// Something that happened on a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established
    Open,
    /// A text frame arrived
    Frame(String),
    /// The transport failed; a `Close` follows
    Error(String),
    /// The transport is gone. Reported exactly once per transport.
    Close { code: CloseCode, reason: String },
}

/// Opens transports
pub trait Connector {
    /// Handle to an opened transport
    type Handle: TransportHandle;

    /// Start opening a transport to `endpoint`.
    ///
    /// Establishment is asynchronous: the handle is returned at once and the
    /// outcome arrives later as `Open`, or as `Error` followed by `Close`.
    /// An `Err` here means the attempt could not even be started.
    fn open(&mut self, endpoint: &Endpoint) -> Result<Self::Handle, ConnectionError>;
}

/// Handle to one transport
pub trait TransportHandle {
    /// Identifier of this transport
    fn id(&self) -> ConnectionId;

    /// Whether the transport is established and accepting frames
    fn is_open(&self) -> bool;

    /// Queue a text frame
    fn send_text(&self, text: String) -> Result<(), ConnectionError>;

    /// Force the transport closed without a status code.
    ///
    /// The resulting `Close` event carries a non-normal code.
    fn close(&self);
}

/// Arms one-shot timers
pub trait Scheduler {
    /// Handle to an armed timer
    type Timer: TimerHandle;

    /// Arm a timer that expires after `delay`
    fn schedule(&mut self, delay: Duration) -> Self::Timer;
}

/// Handle to an armed timer
pub trait TimerHandle {
    /// Disarm the timer; its expiry is never delivered
    fn cancel(self);
}
