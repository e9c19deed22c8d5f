//! Tokio host for the connection manager
//!
//! A single task owns the [`ConnectionManager`] and feeds it, one at a time,
//! everything that can happen: socket events, retry-timer expiries,
//! heartbeat ticks and commands from [`ClientHandle`]s. Because nothing else
//! touches the manager, no handler ever observes a half-applied transition.

mod timer;
mod ws;

pub use timer::{RetryTimer, TokioScheduler};
pub use ws::{WsConnector, WsHandle};

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use dl_core::config::ClientConfig;
use dl_core::error::{ConfigError, ConnectionError};
use dl_core::traits::{TransportEvent, TransportHandle};
use dl_core::{ConnectionId, LinkStatus};
use dl_protocol::OutboundCommand;

use crate::dispatch::Dispatcher;
use crate::manager::ConnectionManager;
use crate::state::ConnectionPhase;

/// Everything the driver task reacts to
#[derive(Debug)]
pub enum DriverEvent {
    /// Something happened on transport `id`
    Transport {
        id: ConnectionId,
        event: TransportEvent,
    },
    /// A retry timer expired
    RetryElapsed { generation: u64 },
    /// Send a command on behalf of a [`ClientHandle`]
    Command(OutboundCommand),
    /// Close the connection and stop
    Shutdown,
}

/// Why [`Driver::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A [`ClientHandle`] asked the driver to stop
    Shutdown,
    /// Every reconnect attempt failed
    Exhausted,
    /// The server closed the connection normally; no reconnect follows
    Closed,
}

/// Cloneable handle for talking to a running [`Driver`]
#[derive(Debug, Clone)]
pub struct ClientHandle {
    events: mpsc::UnboundedSender<DriverEvent>,
}

impl ClientHandle {
    /// Ask the driver to send `command`.
    ///
    /// The command is dropped (with a debug log) unless the connection is
    /// authenticated when the driver gets to it.
    pub fn send(&self, command: OutboundCommand) -> Result<(), ConnectionError> {
        self.events
            .send(DriverEvent::Command(command))
            .map_err(|_| ConnectionError::DriverStopped)
    }

    /// Request fresh status from the device
    pub fn request_status(&self) -> Result<(), ConnectionError> {
        self.send(OutboundCommand::get_status())
    }

    /// Request the log backlog from the device
    pub fn request_logs(&self) -> Result<(), ConnectionError> {
        self.send(OutboundCommand::get_logs())
    }

    /// Close the connection and stop the driver
    pub fn shutdown(&self) {
        let _ = self.events.send(DriverEvent::Shutdown);
    }

    /// Whether the driver is still accepting events
    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }
}

/// Runs a [`ConnectionManager`] over real WebSockets
pub struct Driver {
    manager: ConnectionManager<WsConnector, TokioScheduler>,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    events_rx: mpsc::UnboundedReceiver<DriverEvent>,
    heartbeat: Option<Duration>,
}

impl Driver {
    /// Build a driver from configuration.
    ///
    /// Fails on invalid configuration, including a login-page URL.
    pub fn new(config: &ClientConfig, dispatcher: Dispatcher) -> Result<Self, ConfigError> {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connector = WsConnector::new(events_tx.clone(), config.connect_timeout);
        let scheduler = TokioScheduler::new(events_tx.clone());
        let manager = ConnectionManager::from_config(config, connector, scheduler, dispatcher)?;

        Ok(Self {
            manager,
            events_tx,
            events_rx,
            heartbeat: config.heartbeat(),
        })
    }

    /// Register the status-indicator hook
    pub fn on_indicator(&mut self, hook: impl FnMut(LinkStatus) + Send + 'static) -> &mut Self {
        self.manager.on_indicator(hook);
        self
    }

    /// A handle for sending commands and stopping the driver
    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            events: self.events_tx.clone(),
        }
    }

    pub fn manager(&self) -> &ConnectionManager<WsConnector, TokioScheduler> {
        &self.manager
    }

    /// Connect and keep the connection alive until it ends for good
    pub async fn run(mut self) -> RunOutcome {
        tracing::info!("Starting connection to {}", self.manager.endpoint());
        self.manager.connect();

        let mut heartbeat = self.heartbeat.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            if let Some(outcome) = self.finished() {
                tracing::info!(?outcome, "Connection driver stopping");
                return outcome;
            }

            tokio::select! {
                event = self.events_rx.recv() => {
                    // The driver holds a sender itself, so the queue never closes.
                    let Some(event) = event else {
                        return RunOutcome::Shutdown;
                    };
                    if let Some(outcome) = self.handle_event(event) {
                        tracing::info!(?outcome, "Connection driver stopping");
                        return outcome;
                    }
                }
                _ = tick(&mut heartbeat) => {
                    self.manager.heartbeat();
                }
            }
        }
    }

    fn handle_event(&mut self, event: DriverEvent) -> Option<RunOutcome> {
        match event {
            DriverEvent::Transport { id, event } => {
                let live = self.manager.state().transport().map(|t| t.id());
                if live != Some(id) {
                    tracing::trace!(conn = %id, ?event, "Discarding event from stale transport");
                    return None;
                }
                self.manager.handle_event(event);
            }
            DriverEvent::RetryElapsed { generation } => {
                let armed = self.manager.state().retry_timer().map(|t| t.generation());
                if armed != Some(generation) {
                    tracing::trace!(generation, "Discarding stale retry expiry");
                    return None;
                }
                self.manager.on_retry_elapsed();
            }
            DriverEvent::Command(command) => {
                self.manager.send(&command);
            }
            DriverEvent::Shutdown => {
                self.manager.shutdown();
                return Some(RunOutcome::Shutdown);
            }
        }
        None
    }

    fn finished(&self) -> Option<RunOutcome> {
        if !self.manager.is_settled() {
            return None;
        }
        match self.manager.phase() {
            ConnectionPhase::Failed => Some(RunOutcome::Exhausted),
            ConnectionPhase::Closed => Some(RunOutcome::Closed),
            _ => None,
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn unreachable_config() -> ClientConfig {
        // Bind and release a port so nothing is listening on it.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .map(|addr| addr.port())
            .unwrap();
        ClientConfig {
            page_url: "http://127.0.0.1/".to_string(),
            port,
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_new_refuses_login_page() {
        let config = ClientConfig {
            page_url: "http://192.168.1.100/login.html".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            Driver::new(&config, Dispatcher::new()),
            Err(ConfigError::LoginPage)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_device_exhausts_retries() {
        let mut driver = Driver::new(&unreachable_config(), Dispatcher::new()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        driver.on_indicator(move |status| s.lock().unwrap().push(status));

        let outcome = driver.run().await;
        assert_eq!(outcome, RunOutcome::Exhausted);

        let seen = seen.lock().unwrap();
        let attempts = seen
            .iter()
            .filter(|s| **s == LinkStatus::Connecting)
            .count();
        assert_eq!(attempts, 5);
        assert!(!seen.contains(&LinkStatus::Connected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_driver() {
        let driver = Driver::new(&unreachable_config(), Dispatcher::new()).unwrap();
        let handle = driver.handle();
        handle.shutdown();

        assert_eq!(driver.run().await, RunOutcome::Shutdown);
        assert!(handle.send(OutboundCommand::ping()).is_err());
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_transport_events_are_discarded() {
        let mut driver = Driver::new(&unreachable_config(), Dispatcher::new()).unwrap();
        driver.manager.connect();
        let live = driver.manager.state().transport().map(|t| t.id()).unwrap();

        let stale = ConnectionId(live.0 + 100);
        let outcome = driver.handle_event(DriverEvent::Transport {
            id: stale,
            event: TransportEvent::Open,
        });
        assert!(outcome.is_none());
        assert_eq!(driver.manager.phase(), ConnectionPhase::Connecting);

        driver.handle_event(DriverEvent::RetryElapsed { generation: 42 });
        assert_eq!(driver.manager.phase(), ConnectionPhase::Connecting);
    }
}
