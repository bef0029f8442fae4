//! Error types for the session client.

use thiserror::Error;

/// Errors surfaced by the transport driver.
///
/// None of these escalate beyond the affected session: the worst outcome is a
/// terminated session, and the embedding layer may open a new one (with a
/// fresh identity) if it wants to retry.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The WebSocket connection could not be established.
    #[error("failed to connect to terminal host: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),

    /// The transport failed while the session was live. The session has
    /// already been torn down locally by the time this is returned.
    #[error("transport failure: {0}")]
    Transport(String),
}
