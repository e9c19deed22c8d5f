//! Connection state bookkeeping

use std::fmt;

use dl_core::traits::{TimerHandle, TransportHandle};

/// Lifecycle phase of the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Nothing attempted yet
    Idle,
    /// Transport is being established
    Connecting,
    /// Transport is open, authentication pending
    OpenUnauthenticated,
    /// Server accepted the session
    Authenticated,
    /// Transport is gone; a retry may be pending
    Closed,
    /// Reconnect budget exhausted; nothing more will happen
    Failed,
}

impl ConnectionPhase {
    /// Phases in which a transport handle is held
    pub fn has_transport(&self) -> bool {
        matches!(
            self,
            ConnectionPhase::Connecting
                | ConnectionPhase::OpenUnauthenticated
                | ConnectionPhase::Authenticated
        )
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionPhase::Idle => "idle",
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::OpenUnauthenticated => "open-unauthenticated",
            ConnectionPhase::Authenticated => "authenticated",
            ConnectionPhase::Closed => "closed",
            ConnectionPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The authoritative record of the current connection.
///
/// Holds at most one transport handle and at most one pending retry timer.
/// Only [`crate::manager::ConnectionManager`] mutates it.
pub struct ConnectionState<H, T> {
    pub(crate) phase: ConnectionPhase,
    pub(crate) transport: Option<H>,
    /// Gates outbound sends; tracked apart from `phase`
    pub(crate) authenticated: bool,
    pub(crate) attempts: u32,
    pub(crate) retry_timer: Option<T>,
    /// Initial data already requested for the current authentication
    pub(crate) snapshot_requested: bool,
    /// When the most recent `pong` arrived (Unix millis)
    pub(crate) last_pong: Option<u64>,
}

impl<H, T> ConnectionState<H, T>
where
    H: TransportHandle,
    T: TimerHandle,
{
    /// Fresh state in phase `Idle`
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            transport: None,
            authenticated: false,
            attempts: 0,
            retry_timer: None,
            snapshot_requested: false,
            last_pong: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Live transport handle, if any
    pub fn transport(&self) -> Option<&H> {
        self.transport.as_ref()
    }

    /// Whether outbound sends are allowed by the auth gate
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Reconnect attempts since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether a retry timer is armed
    pub fn has_pending_retry(&self) -> bool {
        self.retry_timer.is_some()
    }

    /// The armed retry timer, if any
    pub fn retry_timer(&self) -> Option<&T> {
        self.retry_timer.as_ref()
    }

    /// When the last `pong` on this connection arrived (Unix millis)
    pub fn last_pong(&self) -> Option<u64> {
        self.last_pong
    }

    /// Nothing is in flight and nothing is scheduled
    pub fn is_settled(&self) -> bool {
        self.transport.is_none() && self.retry_timer.is_none()
    }

    /// Drop the transport and everything tied to it
    pub(crate) fn clear_transport(&mut self) -> Option<H> {
        self.authenticated = false;
        self.snapshot_requested = false;
        self.last_pong = None;
        self.transport.take()
    }

    /// Disarm a pending retry, if any
    pub(crate) fn cancel_retry(&mut self) {
        if let Some(timer) = self.retry_timer.take() {
            timer.cancel();
        }
    }
}

impl<H, T> Default for ConnectionState<H, T>
where
    H: TransportHandle,
    T: TimerHandle,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<H, T> fmt::Debug for ConnectionState<H, T>
where
    H: TransportHandle,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionState")
            .field("phase", &self.phase)
            .field("transport", &self.transport.as_ref().map(|t| t.id()))
            .field("authenticated", &self.authenticated)
            .field("attempts", &self.attempts)
            .field("retry_pending", &self.retry_timer.is_some())
            .field("snapshot_requested", &self.snapshot_requested)
            .finish()
    }
}
