//! Shared gateway state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;

use chatwire_core::config::Config;
use chatwire_core::provider::ChatEngine;
use chatwire_core::store::EventStore;

use crate::calls::PendingCalls;

/// Per-connection bookkeeping. Outbound frames go through `event_tx`; the
/// connection's writer task owns the socket sink.
pub struct ConnectionState {
    pub event_tx: mpsc::UnboundedSender<String>,
}

impl ConnectionState {
    /// Queue a frame for this connection. Returns false if the writer task
    /// is gone.
    pub fn send(&self, frame: String) -> bool {
        self.event_tx.send(frame).is_ok()
    }
}

/// State shared by every connection handler, the relay, and the server.
pub struct GatewayState {
    pub config: Config,
    pub engine: Arc<dyn ChatEngine>,
    pub store: Arc<dyn EventStore>,
    pub calls: PendingCalls,
    pub connections: RwLock<HashMap<String, ConnectionState>>,
}

impl GatewayState {
    pub fn new(config: Config, engine: Arc<dyn ChatEngine>, store: Arc<dyn EventStore>) -> Arc<Self> {
        let calls = PendingCalls::new(config.call_ttl(), config.call_sweep_interval());
        Arc::new(Self {
            config,
            engine,
            store,
            calls,
            connections: RwLock::new(HashMap::new()),
        })
    }

    pub async fn register_connection(&self, conn_id: String, conn: ConnectionState) {
        self.connections.write().await.insert(conn_id.clone(), conn);
        debug!(conn_id = %conn_id, "connection registered");
    }

    pub async fn remove_connection(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
        debug!(conn_id = %conn_id, "connection removed");
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a frame to one connection. Returns false if the connection is
    /// unknown or its writer has shut down.
    pub async fn send_to(&self, conn_id: &str, frame: String) -> bool {
        let connections = self.connections.read().await;
        match connections.get(conn_id) {
            Some(conn) => conn.send(frame),
            None => false,
        }
    }
}
