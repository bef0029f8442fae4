//! WebSocket transport driver.
//!
//! Owns exactly one connection for the lifetime of one session client;
//! connections are never pooled or reused across sessions. The driver turns
//! socket and adapter activity into `SessionEvent`s, processed strictly in
//! arrival order on a single task, and drains the client's outbox into the
//! socket. No automatic reconnection: when the session ends, the embedding
//! layer may construct a new client, which gets a fresh identity.

use crate::emulator::AdapterEvent;
use crate::error::SessionError;
use crate::session::{SessionClient, SessionEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

/// Connect to the host and drive `client` until the session closes.
///
/// `outbox_rx` is the receiving half of the channel the client was built
/// with; `adapter_rx` carries emulator-side events from the embedding layer.
///
/// Returns `Err` if the connection could not be established or failed while
/// live; in both cases the client has already been torn down locally (the
/// lifecycle listener has seen its `disconnected` edge) before this returns.
pub async fn run_session(
    client: &mut SessionClient,
    url: &str,
    mut outbox_rx: mpsc::UnboundedReceiver<String>,
    mut adapter_rx: mpsc::UnboundedReceiver<AdapterEvent>,
) -> Result<(), SessionError> {
    client.begin_connect();
    info!(%url, "connecting to terminal host");

    let (ws_stream, _) = match tokio_tungstenite::connect_async(url).await {
        Ok(connection) => connection,
        Err(e) => {
            client.handle_event(SessionEvent::TransportError(e.to_string()));
            return Err(SessionError::Connect(e));
        }
    };
    client.handle_event(SessionEvent::TransportOpen);

    let (mut ws_sink, mut ws_rx) = ws_stream.split();
    let mut result = Ok(());

    while !client.is_closed() {
        tokio::select! {
            frame = outbox_rx.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = ws_sink.send(Message::Text(frame.into())).await {
                        client.handle_event(SessionEvent::TransportError(e.to_string()));
                        result = Err(SessionError::Transport(e.to_string()));
                    }
                }
                None => client.handle_event(SessionEvent::Shutdown),
            },
            message = ws_rx.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    client.handle_event(SessionEvent::TransportMessage(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(_))) | None => {
                    client.handle_event(SessionEvent::TransportClosed);
                }
                Some(Ok(_)) => {} // Ignore binary/ping/pong
                Some(Err(e)) => {
                    client.handle_event(SessionEvent::TransportError(e.to_string()));
                }
            },
            event = adapter_rx.recv() => match event {
                Some(event) => client.handle_adapter_event(event),
                None => client.handle_event(SessionEvent::Shutdown),
            },
        }
    }

    // Fire-and-forget close; nobody waits for host acknowledgment.
    let _ = ws_sink.close().await;
    debug!("transport released");
    result
}
