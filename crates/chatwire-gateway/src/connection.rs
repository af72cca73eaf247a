//! Per-connection WebSocket lifecycle.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::commands::dispatch_command;
use crate::state::{ConnectionState, GatewayState};

/// Drive one accepted WebSocket until it closes.
///
/// The socket is split: a writer task drains the connection's outbound
/// queue, while this task reads frames and spawns a dispatch task per
/// command so a slow handler never blocks the read loop.
pub async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>) {
    let conn_id = Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "client connected");

    let (mut sink, mut stream) = socket.split();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<String>();

    state
        .register_connection(conn_id.clone(), ConnectionState { event_tx })
        .await;

    let writer_conn = conn_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(frame) = event_rx.recv().await {
            if let Err(e) = sink.send(Message::Text(frame.into())).await {
                debug!(conn_id = %writer_conn, error = %e, "write failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "read failed");
                break;
            }
        };

        match frame {
            Message::Text(raw) => {
                // commands run concurrently; each produces exactly one
                // response on this connection
                let state = state.clone();
                let conn_id = conn_id.clone();
                tokio::spawn(async move {
                    let response = dispatch_command(&state, raw.as_str()).await;
                    match serde_json::to_string(&response) {
                        Ok(frame) => {
                            state.send_to(&conn_id, frame).await;
                        }
                        Err(e) => {
                            warn!(conn_id = %conn_id, error = %e, "response serialization failed");
                        }
                    }
                });
            }
            Message::Close(_) => break,
            // axum answers pings itself; ignore everything else
            _ => {}
        }
    }

    state.remove_connection(&conn_id).await;
    writer.abort();
    info!(conn_id = %conn_id, "client disconnected");
}
