//! End-to-end tests against an in-process WebSocket server speaking the
//! device protocol.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use dl_client::commands::snapshot_dispatcher;
use dl_client::{Driver, LogView, RunOutcome, StatusBoard};
use dl_core::config::{BackoffConfig, ClientConfig};
use dl_core::LinkStatus;

type ServerWs = WebSocketStream<TcpStream>;

const TIMEOUT: Duration = Duration::from_secs(5);

fn client_config(port: u16) -> ClientConfig {
    ClientConfig {
        page_url: "http://127.0.0.1/index.html".to_string(),
        port,
        heartbeat_interval: Duration::ZERO,
        connect_timeout: TIMEOUT,
        backoff: BackoffConfig {
            base: Duration::from_millis(20),
            cap: Duration::from_millis(200),
            max_attempts: 3,
        },
    }
}

async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = tokio::time::timeout(TIMEOUT, listener.accept())
        .await
        .expect("client never connected")
        .unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

/// Next command the client sent, skipping control frames
async fn recv_cmd(ws: &mut ServerWs) -> Value {
    loop {
        let message = tokio::time::timeout(TIMEOUT, ws.next())
            .await
            .expect("no command from client")
            .expect("client went away")
            .unwrap();
        match message {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame from client: {other:?}"),
        }
    }
}

/// Accept the client's auth and collect its initial requests
async fn authenticate(ws: &mut ServerWs) -> Vec<String> {
    send_json(ws, json!({"type": "auth_required", "message": "Please authenticate"})).await;

    let auth = recv_cmd(ws).await;
    assert_eq!(auth["cmd"], "auth");
    assert!(auth["token"].as_str().unwrap().starts_with("session_"));

    send_json(ws, json!({"type": "auth_success"})).await;
    let first = recv_cmd(ws).await;
    let second = recv_cmd(ws).await;
    vec![
        first["cmd"].as_str().unwrap().to_string(),
        second["cmd"].as_str().unwrap().to_string(),
    ]
}

async fn close_normally(mut ws: ServerWs) {
    ws.close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "bye".into(),
    }))
    .await
    .unwrap();
    while let Some(Ok(_)) = ws.next().await {}
}

fn consumers() -> (Arc<Mutex<StatusBoard>>, Arc<Mutex<LogView>>) {
    (
        Arc::new(Mutex::new(StatusBoard::new())),
        Arc::new(Mutex::new(LogView::default())),
    )
}

#[tokio::test]
async fn authenticated_session_delivers_data_to_consumers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let requests = authenticate(&mut ws).await;

        send_json(
            &mut ws,
            json!({"type": "log", "level": "INFO", "timestamp": "12:00:00", "source": "sys", "message": "boot"}),
        )
        .await;
        send_json(
            &mut ws,
            json!({"type": "log", "level": "WARN", "timestamp": "12:00:01", "source": "can", "message": "bus-off"}),
        )
        .await;
        send_json(&mut ws, json!({"type": "ping"})).await;
        ws.send(Message::Text("{broken".to_string())).await.unwrap();
        send_json(
            &mut ws,
            json!({"type": "status", "deviceName": "EK1", "baudRate": 500000, "wsClients": 1}),
        )
        .await;
        send_json(&mut ws, json!({"type": "error", "message": "Invalid baud rate"})).await;

        close_normally(ws).await;
        requests
    });

    let (board, logs) = consumers();
    let mut driver = Driver::new(&client_config(port), snapshot_dispatcher(&board, &logs)).unwrap();
    let links = Arc::new(Mutex::new(Vec::new()));
    let l = Arc::clone(&links);
    driver.on_indicator(move |status| l.lock().unwrap().push(status));

    let outcome = tokio::time::timeout(Duration::from_secs(10), driver.run())
        .await
        .expect("driver did not finish");
    assert_eq!(outcome, RunOutcome::Closed);

    let requests = server.await.unwrap();
    assert_eq!(requests, vec!["get_logs", "get_status"]);

    let logs = logs.lock().unwrap();
    let messages: Vec<_> = logs.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["bus-off", "boot"]);

    let board = board.lock().unwrap();
    let status = board.status().unwrap();
    assert_eq!(status.device_name.as_deref(), Some("EK1"));
    assert_eq!(status.baud_rate, Some(500000));
    assert_eq!(board.last_notice(), Some("Invalid baud rate"));

    assert_eq!(
        *links.lock().unwrap(),
        vec![
            LinkStatus::Connecting,
            LinkStatus::Connected,
            LinkStatus::Disconnected
        ]
    );
}

#[tokio::test]
async fn dropped_connection_is_reestablished() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        // First session dies without a closing handshake.
        let mut ws = accept(&listener).await;
        let first = authenticate(&mut ws).await;
        drop(ws);

        let mut ws = accept(&listener).await;
        let second = authenticate(&mut ws).await;
        send_json(
            &mut ws,
            json!({"type": "log", "level": "INFO", "timestamp": "t", "source": "sys", "message": "back"}),
        )
        .await;
        close_normally(ws).await;
        (first, second)
    });

    let (board, logs) = consumers();
    let mut driver = Driver::new(&client_config(port), snapshot_dispatcher(&board, &logs)).unwrap();
    let links = Arc::new(Mutex::new(Vec::new()));
    let l = Arc::clone(&links);
    driver.on_indicator(move |status| l.lock().unwrap().push(status));

    let outcome = tokio::time::timeout(Duration::from_secs(10), driver.run())
        .await
        .expect("driver did not finish");
    assert_eq!(outcome, RunOutcome::Closed);

    let (first, second) = server.await.unwrap();
    assert_eq!(first, vec!["get_logs", "get_status"]);
    assert_eq!(second, vec!["get_logs", "get_status"]);

    assert_eq!(logs.lock().unwrap().newest().unwrap().message, "back");

    let links = links.lock().unwrap();
    let connected = links
        .iter()
        .filter(|s| **s == LinkStatus::Connected)
        .count();
    assert_eq!(connected, 2);
    assert_eq!(links.last(), Some(&LinkStatus::Disconnected));
}

#[tokio::test]
async fn heartbeat_pings_while_authenticated() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        authenticate(&mut ws).await;

        let ping = recv_cmd(&mut ws).await;
        send_json(&mut ws, json!({"type": "pong", "timestamp": 1234})).await;
        close_normally(ws).await;
        ping
    });

    let config = ClientConfig {
        heartbeat_interval: Duration::from_millis(100),
        ..client_config(port)
    };
    let (board, logs) = consumers();
    let driver = Driver::new(&config, snapshot_dispatcher(&board, &logs)).unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(10), driver.run())
        .await
        .expect("driver did not finish");
    assert_eq!(outcome, RunOutcome::Closed);

    let ping = server.await.unwrap();
    assert_eq!(ping, json!({"cmd": "ping"}));
}

#[tokio::test]
async fn shutdown_closes_with_normal_code() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (authed_tx, authed_rx) = tokio::sync::oneshot::channel();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        authenticate(&mut ws).await;
        let _ = authed_tx.send(());

        loop {
            match tokio::time::timeout(TIMEOUT, ws.next()).await {
                Ok(Some(Ok(Message::Close(frame)))) => return frame.map(|f| u16::from(f.code)),
                Ok(Some(Ok(_))) => continue,
                _ => return None,
            }
        }
    });

    let (board, logs) = consumers();
    let driver = Driver::new(&client_config(port), snapshot_dispatcher(&board, &logs)).unwrap();
    let handle = driver.handle();
    let run = tokio::spawn(driver.run());

    authed_rx.await.unwrap();
    handle.shutdown();

    let outcome = tokio::time::timeout(TIMEOUT, run).await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::Shutdown);
    assert_eq!(server.await.unwrap(), Some(1000));
}
