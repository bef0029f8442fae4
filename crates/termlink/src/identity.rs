//! Session identity and requested-name generation.

use chrono::Utc;
use uuid::Uuid;

/// Identity state for one session.
///
/// `requested_name` keys the spawn handshake; `assigned_id` keys the data
/// plane. Both are immutable once set. This double keying is what isolates
/// sessions that share one broadcast transport: confirmations are matched by
/// name (never by arrival order), output by id.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    requested_name: String,
    assigned_id: Option<String>,
    session_name: Option<String>,
}

impl SessionIdentity {
    /// Generate a fresh identity for `owner`.
    ///
    /// The requested name is practically unique: owner label plus millisecond
    /// timestamp plus a 9-character random suffix.
    pub fn generate(owner: &str) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self {
            requested_name: format!(
                "{}-terminal-{}-{}",
                owner,
                Utc::now().timestamp_millis(),
                &random[..9]
            ),
            assigned_id: None,
            session_name: None,
        }
    }

    /// The name chosen before any network activity.
    pub fn requested_name(&self) -> &str {
        &self.requested_name
    }

    /// The host-assigned identifier, absent until spawn confirmation.
    pub fn assigned_id(&self) -> Option<&str> {
        self.assigned_id.as_deref()
    }

    /// Optional human-readable label from the host. Informational only,
    /// never used for routing.
    pub fn session_name(&self) -> Option<&str> {
        self.session_name.as_deref()
    }

    /// Whether a spawn confirmation carrying `name` belongs to this session.
    pub fn matches_confirmation(&self, name: &str) -> bool {
        self.requested_name == name
    }

    /// Whether a data-plane message carrying `id` belongs to this session.
    /// Always false before the host assigns an id.
    pub fn owns_output(&self, id: &str) -> bool {
        self.assigned_id.as_deref() == Some(id)
    }

    /// Record the host-assigned identity. Only the first call takes effect;
    /// the id is immutable once set.
    pub(crate) fn assign(&mut self, id: String, session_name: Option<String>) {
        if self.assigned_id.is_none() {
            self.assigned_id = Some(id);
            self.session_name = session_name;
        }
    }
}
