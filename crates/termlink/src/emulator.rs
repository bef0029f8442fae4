//! Boundary to the external terminal-rendering engine.

/// Viewport geometry in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

/// Contract with the external terminal-rendering engine.
///
/// `write` appends output and must never block or fail; buffering and
/// backpressure, if any, are the engine's concern. `geometry` is read by the
/// session client only at two well-defined moments: when the settle-delayed
/// first resize fires, and when the adapter reports a resize. It is never
/// polled continuously.
///
/// An engine instance is exclusively bound to one session client at a time;
/// the client drops its handle on teardown, after which the engine may be
/// rebound to a new session.
pub trait Emulator: Send + Sync {
    fn write(&self, bytes: &[u8]);
    fn geometry(&self) -> Geometry;
}

/// Events originating on the emulator side, forwarded to the session client
/// by the embedding layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// Raw keystroke/paste bytes from the user
    UserInput(Vec<u8>),
    /// The viewport geometry changed
    Resize(Geometry),
    /// The embedding layer is tearing this session down
    Shutdown,
}
