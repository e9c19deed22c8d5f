//! Message dispatcher
//!
//! Routes decoded inbound messages to the callbacks registered by UI
//! consumers. Exactly one callback runs per message; messages with an
//! unrecognised type, or for which no consumer registered, are logged and
//! dropped.

use dl_protocol::{FaultRecord, InboundMessage, LogEntry, StatusUpdate};

type Handler<T> = Box<dyn FnMut(&T) + Send>;

/// Where a message went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Status handler
    Status,
    /// Log handler
    Log,
    /// Error-notice handler
    Notice,
    /// Fault handler
    Fault,
    /// Known type, but no consumer registered for it
    Unhandled,
    /// Type the dispatcher does not route
    Ignored,
}

/// Routes inbound messages to consumer callbacks
#[derive(Default)]
pub struct Dispatcher {
    status: Option<Handler<StatusUpdate>>,
    log: Option<Handler<LogEntry>>,
    notice: Option<Box<dyn FnMut(&str) + Send>>,
    fault: Option<Handler<FaultRecord>>,
}

impl Dispatcher {
    /// Create a dispatcher with no consumers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the status consumer
    pub fn on_status(&mut self, handler: impl FnMut(&StatusUpdate) + Send + 'static) -> &mut Self {
        self.status = Some(Box::new(handler));
        self
    }

    /// Register the log consumer
    pub fn on_log(&mut self, handler: impl FnMut(&LogEntry) + Send + 'static) -> &mut Self {
        self.log = Some(Box::new(handler));
        self
    }

    /// Register the error-notice consumer (server `error` and `auth_failed`)
    pub fn on_notice(&mut self, handler: impl FnMut(&str) + Send + 'static) -> &mut Self {
        self.notice = Some(Box::new(handler));
        self
    }

    /// Register the fault-record consumer
    pub fn on_fault(&mut self, handler: impl FnMut(&FaultRecord) + Send + 'static) -> &mut Self {
        self.fault = Some(Box::new(handler));
        self
    }

    /// A log surface is active, so logs should be requested after auth
    pub fn wants_logs(&self) -> bool {
        self.log.is_some()
    }

    /// A status surface is active, so status should be requested after auth
    pub fn wants_status(&self) -> bool {
        self.status.is_some()
    }

    /// Route one message to its consumer
    pub fn dispatch(&mut self, message: &InboundMessage) -> Route {
        let route = match message {
            InboundMessage::Status(status) => invoke(&mut self.status, status, Route::Status),
            InboundMessage::Log(entry) => invoke(&mut self.log, entry, Route::Log),
            InboundMessage::Error { message } | InboundMessage::AuthFailed { message } => {
                invoke(&mut self.notice, message.as_str(), Route::Notice)
            }
            InboundMessage::Fault(record) => invoke(&mut self.fault, record, Route::Fault),
            InboundMessage::Unknown { kind } => {
                tracing::debug!(kind = %kind, "Dropping message of unknown type");
                return Route::Ignored;
            }
            other => {
                tracing::trace!(kind = other.kind(), "Message is not routed to consumers");
                return Route::Ignored;
            }
        };

        if route == Route::Unhandled {
            tracing::debug!(kind = message.kind(), "No consumer registered for message");
        }
        route
    }
}

fn invoke<T: ?Sized>(
    handler: &mut Option<Box<dyn FnMut(&T) + Send>>,
    value: &T,
    route: Route,
) -> Route {
    match handler {
        Some(handler) => {
            handler(value);
            route
        }
        None => Route::Unhandled,
    }
}
