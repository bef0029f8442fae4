//! End-to-end session tests against an in-process WebSocket host.
//!
//! Each test runs a scripted host on a loopback listener and drives a real
//! `SessionClient` through `run_session`, covering the spawn handshake,
//! identity filtering, input forwarding, and teardown behavior.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use termlink::{
    run_session, AdapterEvent, Emulator, Geometry, LifecycleListener, SessionClient,
    SessionOptions, SessionState,
};
use tokio::net::TcpListener;
use tokio_test::assert_ok;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

struct RecordingEmulator {
    written: Mutex<Vec<u8>>,
    geometry: Geometry,
}

impl RecordingEmulator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            written: Mutex::new(Vec::new()),
            geometry: Geometry { cols: 80, rows: 24 },
        })
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.written.lock()).into_owned()
    }
}

impl Emulator for RecordingEmulator {
    fn write(&self, bytes: &[u8]) {
        self.written.lock().extend_from_slice(bytes);
    }
    fn geometry(&self) -> Geometry {
        self.geometry
    }
}

#[derive(Default)]
struct CountingListener {
    connected: AtomicUsize,
    disconnected: AtomicUsize,
}

impl LifecycleListener for CountingListener {
    fn connected(&self) {
        self.connected.fetch_add(1, Ordering::SeqCst);
    }
    fn disconnected(&self) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
    }
}

fn test_options() -> SessionOptions {
    SessionOptions {
        owner: "it".to_string(),
        terminal_type: "bash".to_string(),
        working_dir: "/tmp".to_string(),
        settle_delay: Duration::from_millis(50),
    }
}

/// Extract `config.name` from a spawn request frame.
fn spawn_name(frame: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(frame).unwrap();
    assert_eq!(value["type"], "spawn");
    assert_eq!(value["config"]["terminalType"], "bash");
    value["config"]["name"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_handshake_streams_and_filters() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let host = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let frame = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("expected spawn request, got {:?}", other),
        };
        let name = spawn_name(&frame);

        // Decoy confirmation for a racing session, then the real one.
        ws.send(Message::Text(
            r#"{"type":"terminal-spawned","data":{"id":"9","name":"someone-else"}}"#
                .to_string()
                .into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            format!(
                r#"{{"type":"terminal-spawned","data":{{"id":"7","name":"{}","sessionName":"tabz-1"}}}}"#,
                name
            )
            .into(),
        ))
        .await
        .unwrap();

        // Foreign output must be dropped, matching output written.
        ws.send(Message::Text(
            r#"{"type":"terminal-output","terminalId":"9","data":"foreign\n"}"#
                .to_string()
                .into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"type":"terminal-output","terminalId":"7","data":"ls\n"}"#
                .to_string()
                .into(),
        ))
        .await
        .unwrap();

        // The settle-delayed first resize.
        let frame = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("expected resize request, got {:?}", other),
        };
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "resize");
        assert_eq!(value["terminalId"], "7");
        assert_eq!(value["cols"], 80);
        assert_eq!(value["rows"], 24);

        let _ = ws.close(None).await;
    });

    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let (_adapter_tx, adapter_rx) = mpsc::unbounded_channel();
    let emulator = RecordingEmulator::new();
    let listener_counts = Arc::new(CountingListener::default());
    let mut client = SessionClient::new(
        test_options(),
        outbox_tx,
        emulator.clone(),
        listener_counts.clone(),
    );

    let result = run_session(&mut client, &url, outbox_rx, adapter_rx).await;
    tokio_test::assert_ok!(result);
    host.await.unwrap();

    assert_eq!(client.state(), SessionState::Closed);
    assert_eq!(client.identity().assigned_id(), Some("7"));
    assert_eq!(listener_counts.connected.load(Ordering::SeqCst), 1);
    assert_eq!(listener_counts.disconnected.load(Ordering::SeqCst), 1);

    let text = emulator.text();
    assert!(text.contains("ls\n"));
    assert!(!text.contains("foreign"));
    assert!(text.contains("Session: tabz-1"));
}

#[tokio::test]
async fn test_input_forwarded_with_assigned_id() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let host = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let frame = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("expected spawn request, got {:?}", other),
        };
        let name = spawn_name(&frame);
        ws.send(Message::Text(
            format!(
                r#"{{"type":"terminal-spawned","data":{{"id":"42","name":"{}"}}}}"#,
                name
            )
            .into(),
        ))
        .await
        .unwrap();

        // Settle resize first, then the forwarded keystrokes.
        let resize = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("expected resize request, got {:?}", other),
        };
        let value: serde_json::Value = serde_json::from_str(&resize).unwrap();
        assert_eq!(value["type"], "resize");
        assert_eq!(value["terminalId"], "42");

        let input = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("expected input request, got {:?}", other),
        };
        let value: serde_json::Value = serde_json::from_str(&input).unwrap();
        assert_eq!(value["type"], "command");
        assert_eq!(value["terminalId"], "42");
        assert_eq!(value["command"], "echo hi\n");

        let _ = ws.close(None).await;
    });

    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let (adapter_tx, adapter_rx) = mpsc::unbounded_channel();
    let emulator = RecordingEmulator::new();
    let mut client = SessionClient::new(
        test_options(),
        outbox_tx,
        emulator,
        Arc::new(CountingListener::default()),
    );

    // Type once the handshake and settle resize have had time to finish.
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = adapter_tx.send(AdapterEvent::UserInput(b"echo hi\n".to_vec()));
    });

    let result = run_session(&mut client, &url, outbox_rx, adapter_rx).await;
    tokio_test::assert_ok!(result);
    host.await.unwrap();
    assert_eq!(client.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_connect_failure_reports_and_tears_down() {
    // Grab a port that nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let (_adapter_tx, adapter_rx) = mpsc::unbounded_channel();
    let emulator = RecordingEmulator::new();
    let listener_counts = Arc::new(CountingListener::default());
    let mut client = SessionClient::new(
        test_options(),
        outbox_tx,
        emulator.clone(),
        listener_counts.clone(),
    );

    let result = run_session(&mut client, &url, outbox_rx, adapter_rx).await;
    assert!(result.is_err());
    assert_eq!(client.state(), SessionState::Closed);
    assert_eq!(listener_counts.connected.load(Ordering::SeqCst), 0);
    assert_eq!(listener_counts.disconnected.load(Ordering::SeqCst), 1);
    assert!(emulator
        .text()
        .contains("✗ Connection failed to terminal backend"));
}

#[tokio::test]
async fn test_explicit_shutdown_is_idempotent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let host = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let frame = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => text.as_str().to_owned(),
            other => panic!("expected spawn request, got {:?}", other),
        };
        let name = spawn_name(&frame);
        ws.send(Message::Text(
            format!(
                r#"{{"type":"terminal-spawned","data":{{"id":"3","name":"{}"}}}}"#,
                name
            )
            .into(),
        ))
        .await
        .unwrap();

        // Hold the connection open until the client goes away.
        while ws.next().await.is_some() {}
    });

    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let (adapter_tx, adapter_rx) = mpsc::unbounded_channel();
    let emulator = RecordingEmulator::new();
    let listener_counts = Arc::new(CountingListener::default());
    let mut client = SessionClient::new(
        test_options(),
        outbox_tx,
        emulator,
        listener_counts.clone(),
    );

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = adapter_tx.send(AdapterEvent::Shutdown);
        let _ = adapter_tx.send(AdapterEvent::Shutdown);
    });

    let result = run_session(&mut client, &url, outbox_rx, adapter_rx).await;
    tokio_test::assert_ok!(result);

    // A second teardown after the session already closed must be a no-op.
    client.teardown();
    assert_eq!(client.state(), SessionState::Closed);
    assert_eq!(listener_counts.disconnected.load(Ordering::SeqCst), 1);

    host.await.unwrap();
}
