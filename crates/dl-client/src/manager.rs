//! Connection manager
//!
//! Drives the connection lifecycle:
//!
//! ```text
//! Idle --connect()--> Connecting --Open--> OpenUnauthenticated
//! OpenUnauthenticated --auth_success--> Authenticated
//! Connecting|OpenUnauthenticated|Authenticated --Close(abnormal)--> Closed --retry--> Connecting
//! Closed --retry budget exhausted--> Failed
//! any --Error--> forced close --> Close path
//! ```
//!
//! The manager does no I/O of its own and never blocks. The host feeds it
//! transport events, retry-timer expiries and heartbeat ticks one at a time;
//! the guards in [`ConnectionManager::connect`] and
//! [`ConnectionManager::schedule_reconnect`] keep at most one transport and
//! one retry timer alive.

use dl_core::config::{BackoffConfig, ClientConfig};
use dl_core::error::ConfigError;
use dl_core::time::{current_time_millis, session_token};
use dl_core::traits::{Connector, Scheduler, TransportEvent, TransportHandle};
use dl_core::{Endpoint, LinkStatus};
use dl_protocol::{CloseCode, InboundMessage, OutboundCommand};

use crate::backoff::BackoffPolicy;
use crate::dispatch::Dispatcher;
use crate::state::{ConnectionPhase, ConnectionState};

type Indicator = Box<dyn FnMut(LinkStatus) + Send>;

/// Owns the connection state and drives it through its lifecycle
pub struct ConnectionManager<C, S>
where
    C: Connector,
    S: Scheduler,
{
    endpoint: Endpoint,
    policy: BackoffPolicy,
    max_attempts: u32,
    connector: C,
    scheduler: S,
    state: ConnectionState<C::Handle, S::Timer>,
    dispatcher: Dispatcher,
    indicator: Option<Indicator>,
}

impl<C, S> ConnectionManager<C, S>
where
    C: Connector,
    S: Scheduler,
{
    /// Create a manager in phase `Idle`
    pub fn new(
        endpoint: Endpoint,
        backoff: &BackoffConfig,
        connector: C,
        scheduler: S,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            endpoint,
            policy: BackoffPolicy::from_config(backoff),
            max_attempts: backoff.max_attempts,
            connector,
            scheduler,
            state: ConnectionState::new(),
            dispatcher,
            indicator: None,
        }
    }

    /// Create a manager from client configuration.
    ///
    /// Fails if the endpoint cannot be derived, including on the login page.
    pub fn from_config(
        config: &ClientConfig,
        connector: C,
        scheduler: S,
        dispatcher: Dispatcher,
    ) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint()?;
        Ok(Self::new(
            endpoint,
            &config.backoff,
            connector,
            scheduler,
            dispatcher,
        ))
    }

    /// Register the status-indicator hook
    pub fn on_indicator(&mut self, hook: impl FnMut(LinkStatus) + Send + 'static) -> &mut Self {
        self.indicator = Some(Box::new(hook));
        self
    }

    /// Connection state
    pub fn state(&self) -> &ConnectionState<C::Handle, S::Timer> {
        &self.state
    }

    /// Current phase
    pub fn phase(&self) -> ConnectionPhase {
        self.state.phase
    }

    /// Endpoint this manager connects to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Message dispatcher
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Transport factory
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Timer factory
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Nothing can happen any more without an explicit `connect()`
    pub fn is_settled(&self) -> bool {
        self.state.is_settled()
            && matches!(
                self.state.phase,
                ConnectionPhase::Closed | ConnectionPhase::Failed
            )
    }

    /// Start a connection attempt.
    ///
    /// No-op while a transport exists. Once the attempt counter has reached
    /// the ceiling the manager is done for good and enters `Failed`.
    pub fn connect(&mut self) {
        if self.state.transport.is_some() {
            tracing::trace!("connect() ignored: transport already exists");
            return;
        }
        if self.state.attempts >= self.max_attempts {
            self.state.cancel_retry();
            if self.state.phase != ConnectionPhase::Failed {
                tracing::warn!(
                    "Reconnect budget of {} attempts exhausted; giving up",
                    self.max_attempts
                );
                self.state.phase = ConnectionPhase::Failed;
            }
            return;
        }

        self.state.cancel_retry();
        self.state.phase = ConnectionPhase::Connecting;
        self.indicate(LinkStatus::Connecting);
        tracing::info!(
            attempt = self.state.attempts,
            "Connecting to {}",
            self.endpoint
        );

        match self.connector.open(&self.endpoint) {
            Ok(handle) => {
                tracing::debug!(conn = %handle.id(), "Transport opening");
                self.state.transport = Some(handle);
            }
            Err(e) => {
                tracing::warn!("Failed to start connection: {}", e);
                self.state.phase = ConnectionPhase::Closed;
                self.indicate(LinkStatus::Disconnected);
                self.schedule_reconnect();
            }
        }
    }

    /// Feed one event from the live transport
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Frame(text) => self.on_message(&text),
            TransportEvent::Error(error) => self.on_error(&error),
            TransportEvent::Close { code, reason } => self.on_close(code, &reason),
        }
    }

    /// Transport established: authenticate
    pub fn on_open(&mut self) {
        if self.state.phase != ConnectionPhase::Connecting {
            tracing::debug!(phase = %self.state.phase, "Unexpected open event; ignoring");
            return;
        }

        self.state.phase = ConnectionPhase::OpenUnauthenticated;
        self.state.attempts = 0;
        self.indicate(LinkStatus::Connected);
        tracing::info!("Connected to {}", self.endpoint);

        // The auth gate is closed at this point, so this bypasses `send`.
        self.transmit(&OutboundCommand::auth(session_token()));
    }

    /// Text frame received
    pub fn on_message(&mut self, frame: &str) {
        let message = match InboundMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping malformed frame: {}", e);
                return;
            }
        };
        tracing::trace!(kind = message.kind(), "Inbound message");

        match message {
            InboundMessage::AuthSuccess => self.on_authenticated(),
            InboundMessage::AuthRequired { message } => {
                tracing::debug!(
                    "Server requested authentication: {}",
                    message.as_deref().unwrap_or("-")
                );
            }
            InboundMessage::Pong { timestamp } => {
                tracing::trace!(?timestamp, "Pong received");
                self.state.last_pong = Some(current_time_millis());
            }
            other => {
                if let InboundMessage::AuthFailed { message } = &other {
                    tracing::warn!("Authentication rejected: {}", message);
                }
                self.dispatcher.dispatch(&other);
            }
        }
    }

    fn on_authenticated(&mut self) {
        if !matches!(
            self.state.phase,
            ConnectionPhase::OpenUnauthenticated | ConnectionPhase::Authenticated
        ) {
            tracing::debug!(phase = %self.state.phase, "auth_success outside an open connection; ignoring");
            return;
        }

        self.state.phase = ConnectionPhase::Authenticated;
        self.state.authenticated = true;
        self.state.attempts = 0;

        if self.state.snapshot_requested {
            tracing::warn!("Repeated auth_success on one connection; initial data already requested");
            return;
        }
        self.state.snapshot_requested = true;
        tracing::info!("Authenticated");

        if self.dispatcher.wants_logs() {
            self.send(&OutboundCommand::get_logs());
        }
        if self.dispatcher.wants_status() {
            self.send(&OutboundCommand::get_status());
        }
    }

    /// Transport gone
    pub fn on_close(&mut self, code: CloseCode, reason: &str) {
        if self.state.clear_transport().is_none() {
            tracing::debug!(%code, "Close event without a transport; ignoring");
            return;
        }

        self.state.phase = ConnectionPhase::Closed;
        self.indicate(LinkStatus::Disconnected);
        tracing::info!(%code, reason, "Connection closed");

        if code.is_normal() {
            tracing::info!("Normal closure; not reconnecting");
        } else {
            self.schedule_reconnect();
        }
    }

    /// Stop for good: disarm any retry and drop the transport.
    ///
    /// Events still in flight from the dropped transport must be discarded
    /// by the host.
    pub fn shutdown(&mut self) {
        self.state.cancel_retry();
        if let Some(transport) = self.state.clear_transport() {
            tracing::info!(conn = %transport.id(), "Shutting down connection");
            self.state.phase = ConnectionPhase::Closed;
            self.indicate(LinkStatus::Disconnected);
        } else if self.state.phase == ConnectionPhase::Idle {
            self.state.phase = ConnectionPhase::Closed;
        }
    }

    /// Transport reported an error: force it closed, the close path decides
    /// whether to reconnect
    pub fn on_error(&mut self, error: &str) {
        tracing::warn!("Transport error: {}", error);
        self.indicate(LinkStatus::Error);
        if let Some(transport) = &self.state.transport {
            transport.close();
        }
    }

    /// Arm the retry timer, unless one is pending or the budget is spent
    pub fn schedule_reconnect(&mut self) {
        if self.state.retry_timer.is_some() {
            tracing::trace!("Reconnect already scheduled");
            return;
        }

        self.state.attempts = self.state.attempts.saturating_add(1);
        if self.state.attempts > self.max_attempts {
            tracing::warn!(
                "Maximum reconnect attempts ({}) reached; giving up",
                self.max_attempts
            );
            self.state.phase = ConnectionPhase::Failed;
            return;
        }

        let delay = self.policy.delay(self.state.attempts);
        tracing::info!(
            attempt = self.state.attempts,
            "Reconnecting in {}ms",
            delay.as_millis()
        );
        self.state.retry_timer = Some(self.scheduler.schedule(delay));
    }

    /// The retry timer fired
    pub fn on_retry_elapsed(&mut self) {
        if self.state.retry_timer.take().is_none() {
            tracing::trace!("Stale retry expiry; ignoring");
            return;
        }
        self.connect();
    }

    /// Send a command. Dropped unless the connection is authenticated and
    /// the transport is open; nothing is queued.
    ///
    /// Returns whether the frame was handed to the transport.
    pub fn send(&mut self, command: &OutboundCommand) -> bool {
        let live = self
            .state
            .transport
            .as_ref()
            .is_some_and(|transport| transport.is_open());
        if self.state.phase != ConnectionPhase::Authenticated || !self.state.authenticated || !live
        {
            tracing::debug!(
                cmd = command.name(),
                phase = %self.state.phase,
                "Connection not ready; dropping command"
            );
            return false;
        }
        self.transmit(command)
    }

    /// Send a keep-alive `ping` if authenticated
    pub fn heartbeat(&mut self) -> bool {
        if self.state.phase != ConnectionPhase::Authenticated {
            return false;
        }
        self.send(&OutboundCommand::ping())
    }

    fn transmit(&self, command: &OutboundCommand) -> bool {
        let Some(transport) = &self.state.transport else {
            return false;
        };
        match transport.send_text(command.encode()) {
            Ok(()) => {
                tracing::trace!(cmd = command.name(), "Command sent");
                true
            }
            Err(e) => {
                tracing::warn!(cmd = command.name(), "Failed to send command: {}", e);
                false
            }
        }
    }

    fn indicate(&mut self, status: LinkStatus) {
        tracing::debug!(%status, "Link status");
        if let Some(hook) = &mut self.indicator {
            hook(status);
        }
    }
}
