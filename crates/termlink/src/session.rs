//! Session client state machine.
//!
//! One `SessionClient` owns one logical session on the shared transport:
//! connect, spawn request, confirmation matching, bidirectional streaming,
//! resize, teardown. The transport is not session-aware: every connected
//! client may observe every session's traffic, and multiple spawns may be in
//! flight at once, so correctness rests entirely on the identity filters
//! here, not on any routing guarantee from the transport.
//!
//! The client is single-task and event-driven: the transport driver and the
//! embedding layer feed it `SessionEvent`s in arrival order, and nothing
//! here blocks. It must run inside a tokio runtime (the settle-delayed first
//! resize is a spawned timer task).

use crate::emulator::{AdapterEvent, Emulator, Geometry};
use crate::identity::SessionIdentity;
use crate::lifecycle::{LifecycleListener, LifecycleNotifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use termlink_protocol::{self as protocol, Inbound, Request, SpawnConfig};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Fixed wait between spawn confirmation and the first resize.
///
/// Host-side process allocation is asynchronous relative to the confirmation
/// message; resizing before it completes is undefined on the host side.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Session lifecycle states.
///
/// `Closed` is terminal and irreversible; a new session requires a new
/// `SessionClient` (which gets a fresh identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    AwaitingSpawnConfirmation,
    Active,
    Closing,
    Closed,
}

/// Transport- and adapter-side events driving the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The transport finished opening.
    TransportOpen,
    /// One text frame arrived on the transport.
    TransportMessage(String),
    /// The transport reported an error.
    TransportError(String),
    /// The transport closed.
    TransportClosed,
    /// Raw keystroke/paste bytes from the emulator side.
    UserInput(Vec<u8>),
    /// The emulator viewport changed.
    Resize(Geometry),
    /// Explicit teardown from the embedding layer.
    Shutdown,
}

/// How the session should be spawned on the host.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Owner label folded into the requested name (e.g. an agent name).
    pub owner: String,
    /// Shell type requested from the host.
    pub terminal_type: String,
    /// Working directory for the spawned shell.
    pub working_dir: String,
    /// Wait between spawn confirmation and the first resize.
    pub settle_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            owner: "agent".to_string(),
            terminal_type: "bash".to_string(),
            working_dir: String::new(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Client for one logical terminal session.
pub struct SessionClient {
    state: SessionState,
    identity: SessionIdentity,
    options: SessionOptions,
    /// Outbound wire frames, drained by the transport writer.
    outbox: mpsc::UnboundedSender<String>,
    /// Bound emulator; released on teardown so the engine can be rebound.
    emulator: Option<Arc<dyn Emulator>>,
    lifecycle: LifecycleNotifier,
    /// Set on teardown; gates the pending settle-resize timer.
    closed: Arc<AtomicBool>,
}

impl SessionClient {
    /// Create a client in `Idle` with a freshly generated identity.
    pub fn new(
        options: SessionOptions,
        outbox: mpsc::UnboundedSender<String>,
        emulator: Arc<dyn Emulator>,
        listener: Arc<dyn LifecycleListener>,
    ) -> Self {
        let identity = SessionIdentity::generate(&options.owner);
        debug!(name = %identity.requested_name(), "new session client");
        Self {
            state: SessionState::Idle,
            identity,
            options,
            outbox,
            emulator: Some(emulator),
            lifecycle: LifecycleNotifier::new(listener),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// The transport is being opened. `Idle → Connecting`.
    pub fn begin_connect(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Connecting;
        }
    }

    /// Drive the state machine with one event.
    ///
    /// Events arriving after teardown began are ignored; teardown through
    /// `Shutdown` is idempotent.
    pub fn handle_event(&mut self, event: SessionEvent) {
        if matches!(self.state, SessionState::Closing | SessionState::Closed) {
            return;
        }
        match event {
            SessionEvent::TransportOpen => self.on_transport_open(),
            SessionEvent::TransportMessage(text) => self.on_message(&text),
            SessionEvent::TransportError(reason) => self.on_transport_error(&reason),
            SessionEvent::TransportClosed => self.on_transport_closed(),
            SessionEvent::UserInput(bytes) => self.on_user_input(&bytes),
            SessionEvent::Resize(geometry) => self.on_resize(geometry),
            SessionEvent::Shutdown => self.teardown(),
        }
    }

    /// Tear the session down.
    ///
    /// In order: stop accepting adapter events and cancel the pending settle
    /// resize, emit `disconnected` (at most once), release the emulator
    /// binding. The transport socket itself is closed by the driver,
    /// fire-and-forget. Idempotent: a second call is a no-op.
    pub fn teardown(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closing;
        self.closed.store(true, Ordering::SeqCst);
        self.lifecycle.notify_disconnected();
        self.emulator = None;
        self.state = SessionState::Closed;
    }

    // ── Transport events ───────────────────────────────────────────

    fn on_transport_open(&mut self) {
        if self.state != SessionState::Connecting {
            debug!(state = ?self.state, "transport open in unexpected state, ignoring");
            return;
        }
        self.lifecycle.notify_connected();
        self.write_line("\x1b[1;32m✓ Connected to terminal backend\x1b[0m");
        self.write_line(&format!(
            "\x1b[1;90mSpawning {} session...\x1b[0m",
            self.options.terminal_type
        ));

        let request = Request::Spawn {
            config: SpawnConfig {
                terminal_type: self.options.terminal_type.clone(),
                name: self.identity.requested_name().to_string(),
                working_dir: self.options.working_dir.clone(),
            },
        };
        debug!(name = %self.identity.requested_name(), "sending spawn request");
        self.send(&request);
        self.state = SessionState::AwaitingSpawnConfirmation;
    }

    fn on_message(&mut self, text: &str) {
        match protocol::decode(text) {
            Inbound::Spawned {
                id,
                name,
                session_name,
            } => self.on_spawn_confirmation(id, name, session_name),
            Inbound::Output { terminal_id, data } => self.on_output(&terminal_id, &data),
            Inbound::Unknown { message_type } => {
                debug!(%message_type, "ignoring message of unknown type");
            }
            // The host may stream raw bytes outside the structured envelope.
            Inbound::Raw(data) => self.write(data.as_bytes()),
        }
    }

    fn on_spawn_confirmation(&mut self, id: String, name: String, session_name: Option<String>) {
        if self.state != SessionState::AwaitingSpawnConfirmation {
            debug!(%name, "spawn confirmation outside handshake, ignoring");
            return;
        }
        if !self.identity.matches_confirmation(&name) {
            // A concurrently racing session on the shared transport.
            debug!(
                theirs = %name,
                ours = %self.identity.requested_name(),
                "spawn confirmation for a different session, ignoring"
            );
            return;
        }

        info!(%id, session_name = ?session_name, "terminal spawned");
        self.identity.assign(id, session_name);
        self.state = SessionState::Active;

        self.write_line(&format!(
            "\x1b[1;36m✓ Terminal ready: {}\x1b[0m",
            self.options.owner
        ));
        let label = self
            .identity
            .session_name()
            .or(self.identity.assigned_id())
            .unwrap_or_default()
            .to_string();
        self.write_line(&format!("\x1b[1;33mSession: {}\x1b[0m", label));

        self.schedule_settle_resize();
    }

    fn on_output(&mut self, terminal_id: &str, data: &str) {
        if !self.identity.owns_output(terminal_id) {
            // Another session's traffic, or output before assignment.
            debug!(
                theirs = %terminal_id,
                ours = ?self.identity.assigned_id(),
                "output for a different terminal, ignoring"
            );
            return;
        }
        self.write(data.as_bytes());
    }

    fn on_transport_error(&mut self, reason: &str) {
        warn!(%reason, "transport error");
        self.write(b"\r\n");
        self.write_line("\x1b[1;31m✗ Connection failed to terminal backend\x1b[0m");
        self.teardown();
    }

    fn on_transport_closed(&mut self) {
        // A close before a confirmation is a spawn failure, not an
        // active-session drop; only the latter gets a diagnostic line.
        if self.state == SessionState::Active {
            self.write(b"\r\n");
            self.write_line("\x1b[1;33m⚠ Connection closed\x1b[0m");
        }
        info!(state = ?self.state, "transport closed");
        self.teardown();
    }

    // ── Adapter events ─────────────────────────────────────────────

    fn on_user_input(&mut self, bytes: &[u8]) {
        // Data-plane messages are illegal before the host assigns an id.
        if self.state != SessionState::Active {
            debug!(state = ?self.state, "dropping user input, session not active");
            return;
        }
        let Some(id) = self.identity.assigned_id() else {
            return;
        };
        let request = Request::Input {
            terminal_id: id.to_string(),
            command: String::from_utf8_lossy(bytes).into_owned(),
        };
        self.send(&request);
    }

    fn on_resize(&mut self, geometry: Geometry) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(id) = self.identity.assigned_id() else {
            return;
        };
        let request = Request::Resize {
            terminal_id: id.to_string(),
            cols: geometry.cols,
            rows: geometry.rows,
        };
        self.send(&request);
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Send the first resize after the settle delay, reading the geometry at
    /// send time. Skipped if the session is torn down before the delay
    /// elapses.
    fn schedule_settle_resize(&self) {
        let Some(emulator) = self.emulator.clone() else {
            return;
        };
        let Some(id) = self.identity.assigned_id().map(str::to_string) else {
            return;
        };
        let outbox = self.outbox.clone();
        let closed = Arc::clone(&self.closed);
        let delay = self.options.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if closed.load(Ordering::SeqCst) {
                return;
            }
            let geometry = emulator.geometry();
            let frame = protocol::encode(&Request::Resize {
                terminal_id: id,
                cols: geometry.cols,
                rows: geometry.rows,
            });
            let _ = outbox.send(frame);
        });
    }

    fn send(&self, request: &Request) {
        if self.outbox.send(protocol::encode(request)).is_err() {
            debug!("outbox closed, dropping request");
        }
    }

    fn write(&self, bytes: &[u8]) {
        if let Some(emulator) = &self.emulator {
            emulator.write(bytes);
        }
    }

    /// Write one diagnostic line to the emulator, CRLF-terminated.
    fn write_line(&self, line: &str) {
        if let Some(emulator) = &self.emulator {
            emulator.write(line.as_bytes());
            emulator.write(b"\r\n");
        }
    }

    /// Route an adapter-side event into the state machine.
    pub fn handle_adapter_event(&mut self, event: AdapterEvent) {
        match event {
            AdapterEvent::UserInput(bytes) => self.handle_event(SessionEvent::UserInput(bytes)),
            AdapterEvent::Resize(geometry) => self.handle_event(SessionEvent::Resize(geometry)),
            AdapterEvent::Shutdown => self.handle_event(SessionEvent::Shutdown),
        }
    }
}
