//! Shared wire format for termlink client ↔ terminal-host communication.
//!
//! This crate is intentionally lightweight (only `serde` + `serde_json`).
//! It defines:
//! - Outbound request messages (spawn / resize / input)
//! - Inbound message classification with a raw-output fallback
//! - `encode` / `decode` between typed messages and transport text frames
//!
//! The transport is broadcast-style: frames for every session may arrive on
//! every connection. The codec itself is stateless and does no filtering;
//! identity matching is the session client's job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Outbound requests ──────────────────────────────────────────────

/// Host-process configuration carried by a spawn request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Shell type to spawn (e.g. "bash")
    #[serde(rename = "terminalType")]
    pub terminal_type: String,
    /// Client-chosen requested name, echoed back in the spawn confirmation
    pub name: String,
    /// Working directory for the spawned process
    #[serde(rename = "workingDir")]
    pub working_dir: String,
}

/// Client → host request messages.
///
/// The input variant is tagged `command` on the wire with a `command` payload
/// field, since that is what the host actually speaks; `Input` is only this
/// crate's name for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "spawn")]
    Spawn { config: SpawnConfig },
    #[serde(rename = "resize")]
    Resize {
        #[serde(rename = "terminalId")]
        terminal_id: String,
        cols: u16,
        rows: u16,
    },
    #[serde(rename = "command")]
    Input {
        #[serde(rename = "terminalId")]
        terminal_id: String,
        command: String,
    },
}

/// Encode a request as a transport text frame.
///
/// Deterministic; cannot fail for these types.
pub fn encode(request: &Request) -> String {
    serde_json::to_string(request).unwrap_or_default()
}

// ── Inbound classification ─────────────────────────────────────────

/// Host → client messages after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Spawn confirmation (`terminal-spawned`)
    Spawned {
        id: String,
        name: String,
        session_name: Option<String>,
    },
    /// Output for one terminal (`terminal-output`, legacy `output`)
    Output { terminal_id: String, data: String },
    /// Structured message of a type this client does not understand.
    /// Available for diagnostics, ignored by all other consumers.
    Unknown { message_type: String },
    /// Payload that does not parse as a structured record. Hosts may
    /// legitimately stream raw terminal bytes outside the envelope, so this
    /// is written straight to the emulator rather than treated as an error.
    Raw(String),
}

/// Decode one inbound text frame.
///
/// Never fails: anything that is not a well-formed structured record of a
/// known shape becomes `Inbound::Raw`.
pub fn decode(text: &str) -> Inbound {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return Inbound::Raw(text.to_string()),
    };
    let Some(message_type) = value.get("type").and_then(Value::as_str) else {
        return Inbound::Raw(text.to_string());
    };
    match message_type {
        "terminal-spawned" => {
            decode_spawned(&value).unwrap_or_else(|| Inbound::Raw(text.to_string()))
        }
        "terminal-output" | "output" => {
            decode_output(&value).unwrap_or_else(|| Inbound::Raw(text.to_string()))
        }
        other => Inbound::Unknown {
            message_type: other.to_string(),
        },
    }
}

fn decode_spawned(value: &Value) -> Option<Inbound> {
    let data = value.get("data")?;
    let id = opaque_id(data.get("id")?)?;
    let name = data.get("name")?.as_str()?.to_string();
    let session_name = data
        .get("sessionName")
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(Inbound::Spawned {
        id,
        name,
        session_name,
    })
}

fn decode_output(value: &Value) -> Option<Inbound> {
    let terminal_id = opaque_id(value.get("terminalId")?)?;
    let data = value.get("data")?.as_str()?.to_string();
    Some(Inbound::Output { terminal_id, data })
}

/// Hosts serialize terminal ids as either JSON strings or numbers; both map
/// to the same opaque string id.
fn opaque_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
