//! Chatwire wire protocol.
//!
//! All gateway traffic is JSON-over-WebSocket using a single flat envelope
//! `{event, data}`: server->client broadcasts, client->server commands, and
//! server->client responses all share the shape. A command named `foo` is
//! answered with `foo_success` on success or `error` on failure, on the
//! issuing connection only.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The `{event, data}` wire envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Success response for a command: `{event: "<command>_success", data}`.
    pub fn success(command: &str, data: Value) -> Self {
        Self {
            event: format!("{command}_success"),
            data,
        }
    }

    /// Error response: `{event: "error", data: {message, detail}}`.
    pub fn error(message: &str, detail: Option<&str>) -> Self {
        Self {
            event: "error".to_string(),
            data: json!({
                "message": message,
                "detail": detail,
            }),
        }
    }
}
