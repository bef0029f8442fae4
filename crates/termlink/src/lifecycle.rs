//! Lifecycle notifications to the embedding layer.
//!
//! Decouples the embedder's visual state (e.g. an online/offline indicator)
//! from protocol internals: the session client reports connected/disconnected
//! edges here and nowhere else.

use std::sync::Arc;
use tracing::info;

/// Callbacks delivered to the embedding component.
///
/// Both methods default to no-ops so embedders can implement only the edge
/// they care about.
pub trait LifecycleListener: Send + Sync {
    /// The transport connected (fires before the spawn request is sent).
    fn connected(&self) {}

    /// The session ended, for any reason: explicit teardown, transport
    /// failure, or spawn failure.
    fn disconnected(&self) {}
}

/// Listener for embedders that do not track lifecycle state.
pub struct NullListener;

impl LifecycleListener for NullListener {}

/// Delivers each lifecycle edge at most once.
///
/// A session connects at most once and disconnects at most once; teardown is
/// idempotent and must not emit a second `disconnected`.
pub(crate) struct LifecycleNotifier {
    listener: Arc<dyn LifecycleListener>,
    connected_sent: bool,
    disconnected_sent: bool,
}

impl LifecycleNotifier {
    pub(crate) fn new(listener: Arc<dyn LifecycleListener>) -> Self {
        Self {
            listener,
            connected_sent: false,
            disconnected_sent: false,
        }
    }

    pub(crate) fn notify_connected(&mut self) {
        if !self.connected_sent {
            self.connected_sent = true;
            info!("session transport connected");
            self.listener.connected();
        }
    }

    pub(crate) fn notify_disconnected(&mut self) {
        if !self.disconnected_sent {
            self.disconnected_sent = true;
            info!("session disconnected");
            self.listener.disconnected();
        }
    }
}
