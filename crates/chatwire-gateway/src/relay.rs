//! Engine event relay: normalize, persist, broadcast.
//!
//! Each event runs under a supervisor that logs failures and moves on; a bad
//! event never takes the relay loop down. Persistence failures are logged
//! and swallowed so a broken sink cannot block delivery to subscribers.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use chatwire_core::event::{DomainEvent, StatusEntry};
use chatwire_core::provider::{EngineEvent, EngineEventReceiver};

use crate::events::broadcast_event;
use crate::state::GatewayState;

/// Consume the engine's event stream until the sender side closes.
pub fn start_event_relay(
    state: Arc<GatewayState>,
    mut events: EngineEventReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("event relay started");
        while let Some(event) = events.recv().await {
            let kind = event.kind();
            debug!(kind, "engine event");
            handle_engine_event(&state, event).await;
        }
        info!("engine event stream closed, relay stopping");
    })
}

async fn handle_engine_event(state: &GatewayState, event: EngineEvent) {
    match event {
        EngineEvent::Qr { code } => {
            broadcast_event(state, &DomainEvent::Qr(code)).await;
        }
        EngineEvent::Ready { info } => {
            info!("engine ready");
            broadcast_event(state, &DomainEvent::Ready(info)).await;
        }
        EngineEvent::AuthFailure { message } => {
            error!(message = %message, "engine authentication failed");
            broadcast_event(state, &DomainEvent::AuthFailure(message)).await;
        }
        EngineEvent::Disconnected { reason } => {
            info!(reason = %reason, "engine disconnected");
            broadcast_event(state, &DomainEvent::Disconnected(reason)).await;
        }
        EngineEvent::Message {
            message,
            chat,
            contact,
        } => {
            persist("chat", state.store.upsert_chat(&chat)).await;
            broadcast_event(state, &DomainEvent::ChatUpdate(chat)).await;

            persist("contact", state.store.upsert_contact(&contact)).await;
            broadcast_event(state, &DomainEvent::ContactUpdate(contact.clone())).await;

            if message.is_status {
                let entry = StatusEntry::from_message(&message);
                persist(
                    "status",
                    state
                        .store
                        .append_status(&contact.id, contact.display_name(), &entry),
                )
                .await;
                broadcast_event(
                    state,
                    &DomainEvent::NewStatus {
                        contact_id: contact.id.clone(),
                        update: entry,
                    },
                )
                .await;
            }

            persist("message", state.store.insert_message(&message)).await;
            broadcast_event(state, &DomainEvent::NewMessage(message)).await;
        }
        EngineEvent::MessageCreate { message } => {
            // only echo what this account itself sent; inbound traffic
            // already arrives through the message event
            if !message.from_me {
                return;
            }
            broadcast_event(
                state,
                &DomainEvent::MessageCreate {
                    id: message.id,
                    from: message.from,
                    to: message.to,
                    body: message.body,
                    kind: message.kind,
                },
            )
            .await;
        }
        EngineEvent::MessageEdit {
            message_id,
            new_body,
            old_body,
        } => {
            broadcast_event(
                state,
                &DomainEvent::MessageEdit {
                    message_id,
                    new_body,
                    old_body,
                },
            )
            .await;
        }
        EngineEvent::MessageReaction {
            reaction,
            message_id,
            sender_id,
        } => {
            broadcast_event(
                state,
                &DomainEvent::MessageReaction {
                    reaction,
                    msg_id: message_id,
                    sender_id,
                },
            )
            .await;
        }
        EngineEvent::MediaUploaded { message_id } => {
            broadcast_event(state, &DomainEvent::MediaUploaded { message_id }).await;
        }
        EngineEvent::Call { call, handle } => {
            state.calls.put(call.id.clone(), handle);
            persist("call", state.store.insert_call(&call)).await;
            broadcast_event(state, &DomainEvent::IncomingCall(call)).await;
        }
    }
}

/// Run a store write, logging and swallowing failure. Delivery to
/// subscribers must not depend on the sink being healthy.
async fn persist<F>(what: &str, write: F)
where
    F: Future<Output = chatwire_core::error::Result<()>>,
{
    if let Err(e) = write.await {
        error!(what, error = %e, "persistence failed");
    }
}
