//! Termlink: terminal-session protocol client.
//!
//! Opens independent shell sessions against a remote terminal host over a
//! shared, broadcast-style WebSocket transport. The transport is not
//! session-aware: every connected client may observe traffic for every
//! session, and concurrent spawns race. Isolation comes entirely from
//! double-keyed identity matching (the client-chosen requested name during
//! the spawn handshake, the host-assigned id on the data plane) with
//! discard-on-mismatch for everything else.
//!
//! # Structure
//! - `session`: the per-session state machine (connect, spawn, stream,
//!   teardown)
//! - `transport`: tokio-tungstenite driver, one connection per session
//! - `emulator`: boundary to the external terminal-rendering engine
//! - `lifecycle`: connected/disconnected callbacks for the embedding layer
//! - `identity`: requested-name generation and id matching
//!
//! Wire message types live in the `termlink-protocol` crate.

pub mod config;
pub mod emulator;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod session;
pub mod transport;

pub use config::Config;
pub use emulator::{AdapterEvent, Emulator, Geometry};
pub use error::SessionError;
pub use identity::SessionIdentity;
pub use lifecycle::{LifecycleListener, NullListener};
pub use session::{
    SessionClient, SessionEvent, SessionOptions, SessionState, DEFAULT_SETTLE_DELAY,
};
pub use transport::run_session;
