//! Event fan-out to connected subscribers.

use tracing::{debug, warn};

use chatwire_core::event::DomainEvent;

use crate::state::GatewayState;

/// Broadcast a domain event to every connected subscriber.
///
/// The envelope is serialized once and the same frame is queued on every
/// connection. Connections whose writer has shut down are evicted.
pub async fn broadcast_event(state: &GatewayState, event: &DomainEvent) {
    let frame = match serde_json::to_string(event) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(kind = event.kind(), error = %e, "failed to serialize event");
            return;
        }
    };
    broadcast_frame(state, event.kind(), frame).await;
}

async fn broadcast_frame(state: &GatewayState, kind: &str, frame: String) {
    let mut dead = Vec::new();
    {
        let connections = state.connections.read().await;
        if connections.is_empty() {
            return;
        }
        for (conn_id, conn) in connections.iter() {
            if !conn.send(frame.clone()) {
                dead.push(conn_id.clone());
            }
        }
        debug!(kind, subscribers = connections.len() - dead.len(), "event broadcast");
    }

    if !dead.is_empty() {
        let mut connections = state.connections.write().await;
        for conn_id in dead {
            connections.remove(&conn_id);
            debug!(conn_id = %conn_id, "evicted dead connection");
        }
    }
}
