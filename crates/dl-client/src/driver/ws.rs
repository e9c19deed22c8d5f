//! WebSocket transport
//!
//! Each [`WsConnector::open`] spawns one socket task. The task reports back
//! through the driver queue: `Open` once the handshake completes, `Frame`
//! per text message, `Error` on failure, and exactly one `Close` at the end.
//! Close codes follow RFC 6455: the peer's code if it sent one, 1005 when
//! its close frame had no status, 1006 when the stream just ended.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use dl_core::error::ConnectionError;
use dl_core::traits::{Connector, TransportEvent, TransportHandle};
use dl_core::{ConnectionId, Endpoint};
use dl_protocol::CloseCode;

use super::DriverEvent;

/// How long the socket task waits for its closing handshake
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Frames queued by a [`WsHandle`] for its socket task
#[derive(Debug)]
enum Outbound {
    Text(String),
    /// Close without a status code
    Abort,
}

/// Opens WebSocket transports on the current tokio runtime
pub struct WsConnector {
    events: mpsc::UnboundedSender<DriverEvent>,
    connect_timeout: Duration,
    next_id: u64,
}

impl WsConnector {
    pub fn new(events: mpsc::UnboundedSender<DriverEvent>, connect_timeout: Duration) -> Self {
        Self {
            events,
            connect_timeout,
            next_id: 0,
        }
    }
}

impl Connector for WsConnector {
    type Handle = WsHandle;

    fn open(&mut self, endpoint: &Endpoint) -> Result<WsHandle, ConnectionError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| ConnectionError::Establish {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let open = Arc::new(AtomicBool::new(false));

        let socket = SocketTask {
            id,
            url: endpoint.as_str().to_string(),
            connect_timeout: self.connect_timeout,
            events: self.events.clone(),
            outbound: outbound_rx,
            cancel: cancel.clone(),
            open: Arc::clone(&open),
        };
        runtime.spawn(socket.run());

        Ok(WsHandle {
            id,
            outbound: outbound_tx,
            cancel,
            open,
        })
    }
}

/// Handle to one socket task.
///
/// Dropping the handle shuts the socket down with a normal close; the
/// resulting events carry a stale id and are discarded by the driver.
pub struct WsHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    cancel: CancellationToken,
    open: Arc<AtomicBool>,
}

impl WsHandle {
    /// Close with status 1000 (normal closure)
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl TransportHandle for WsHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send_text(&self, text: String) -> Result<(), ConnectionError> {
        if !self.is_open() {
            return Err(ConnectionError::TransportClosed);
        }
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| ConnectionError::TransportClosed)
    }

    fn close(&self) {
        if self.outbound.send(Outbound::Abort).is_err() {
            tracing::trace!(conn = %self.id, "Socket task already finished");
        }
    }
}

impl Drop for WsHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct SocketTask {
    id: ConnectionId,
    url: String,
    connect_timeout: Duration,
    events: mpsc::UnboundedSender<DriverEvent>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    cancel: CancellationToken,
    open: Arc<AtomicBool>,
}

impl SocketTask {
    fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(DriverEvent::Transport { id: self.id, event });
    }

    fn emit_close(&self, code: CloseCode, reason: impl Into<String>) {
        self.open.store(false, Ordering::SeqCst);
        self.emit(TransportEvent::Close {
            code,
            reason: reason.into(),
        });
    }

    async fn run(mut self) {
        let connect = tokio::time::timeout(
            self.connect_timeout,
            tokio_tungstenite::connect_async(self.url.as_str()),
        );

        let stream = tokio::select! {
            _ = self.cancel.cancelled() => {
                self.emit_close(CloseCode::NORMAL, "cancelled before open");
                return;
            }
            result = connect => match result {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(e)) => {
                    tracing::debug!(conn = %self.id, "WebSocket handshake failed: {}", e);
                    self.emit(TransportEvent::Error(e.to_string()));
                    self.emit_close(CloseCode::ABNORMAL, "");
                    return;
                }
                Err(_) => {
                    tracing::debug!(conn = %self.id, "WebSocket handshake timed out");
                    self.emit(TransportEvent::Error(format!(
                        "connect timed out after {:?}",
                        self.connect_timeout
                    )));
                    self.emit_close(CloseCode::ABNORMAL, "");
                    return;
                }
            }
        };

        self.open.store(true, Ordering::SeqCst);
        self.emit(TransportEvent::Open);

        let (mut write, mut read) = stream.split();

        let (code, reason) = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let frame = CloseFrame {
                        code: WsCloseCode::Normal,
                        reason: "client shutdown".into(),
                    };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    break (CloseCode::NORMAL, "client shutdown".to_string());
                }
                outbound = self.outbound.recv() => match outbound {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            self.emit(TransportEvent::Error(e.to_string()));
                            break (CloseCode::ABNORMAL, e.to_string());
                        }
                    }
                    Some(Outbound::Abort) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        break (CloseCode::NO_STATUS, String::new());
                    }
                },
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => self.emit(TransportEvent::Frame(text)),
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => (CloseCode(u16::from(frame.code)), frame.reason.into_owned()),
                            None => (CloseCode::NO_STATUS, String::new()),
                        };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.emit(TransportEvent::Error(e.to_string()));
                        break (CloseCode::ABNORMAL, e.to_string());
                    }
                    None => break (CloseCode::ABNORMAL, String::new()),
                },
            }
        };

        self.open.store(false, Ordering::SeqCst);
        let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, write.close()).await;
        tracing::debug!(conn = %self.id, %code, "Socket task finished");
        self.emit_close(code, reason);
    }
}
