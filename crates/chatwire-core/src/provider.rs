//! Capability-provider facade over the external chat-automation engine.
//!
//! The gateway never talks to the automation engine directly; it goes through
//! [`ChatEngine`] and the per-entity handle traits. Lookup operations return
//! `Option` — an absent entity is a normal outcome, not an error — while the
//! operations themselves return opaque JSON payloads the gateway forwards
//! verbatim.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::event::{CallSnapshot, ChatSnapshot, ContactSnapshot, MessageSnapshot};

/// Opaque media blob passed between the engine and clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub mimetype: String,
    /// Base64-encoded content.
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

/// Handle to a chat resolved by id.
#[async_trait]
pub trait ChatRef: Send + Sync {
    async fn clear_messages(&self) -> anyhow::Result<Value>;
    async fn clear_state(&self) -> anyhow::Result<Value>;
    async fn delete(&self) -> anyhow::Result<Value>;
    async fn contact(&self) -> anyhow::Result<Value>;
    async fn send_state_typing(&self) -> anyhow::Result<Value>;
    async fn sync_history(&self) -> anyhow::Result<Value>;
}

/// Handle to a contact resolved by id.
#[async_trait]
pub trait ContactRef: Send + Sync {
    async fn block(&self) -> anyhow::Result<Value>;
    async fn unblock(&self) -> anyhow::Result<Value>;
    async fn about(&self) -> anyhow::Result<Value>;
    async fn chat(&self) -> anyhow::Result<Value>;
    async fn common_groups(&self) -> anyhow::Result<Value>;
    async fn country_code(&self) -> anyhow::Result<Value>;
    async fn formatted_number(&self) -> anyhow::Result<Value>;
    async fn profile_pic_url(&self) -> anyhow::Result<Value>;
}

/// Handle to a message resolved by id.
#[async_trait]
pub trait MessageRef: Send + Sync {
    fn has_media(&self) -> bool;
    async fn chat(&self) -> anyhow::Result<Value>;
    async fn contact(&self) -> anyhow::Result<Value>;
    async fn delete(&self, for_everyone: bool) -> anyhow::Result<Value>;
    async fn download_media(&self) -> anyhow::Result<MediaPayload>;
    async fn edit(&self, new_content: &str) -> anyhow::Result<Value>;
    async fn info(&self) -> anyhow::Result<Value>;
    async fn reactions(&self) -> anyhow::Result<Value>;
    async fn react(&self, reaction: &str) -> anyhow::Result<Value>;
    async fn reply(&self, content: &str) -> anyhow::Result<Value>;
}

/// Handle to an incoming call, held while the call can still be rejected.
#[async_trait]
pub trait CallRef: Send + Sync {
    async fn reject(&self) -> anyhow::Result<()>;
}

/// The capability-provider facade.
#[async_trait]
pub trait ChatEngine: Send + Sync + 'static {
    async fn chat(&self, chat_id: &str) -> anyhow::Result<Option<Arc<dyn ChatRef>>>;
    async fn contact(&self, contact_id: &str) -> anyhow::Result<Option<Arc<dyn ContactRef>>>;
    async fn message(&self, message_id: &str) -> anyhow::Result<Option<Arc<dyn MessageRef>>>;

    async fn send_message(&self, chat_id: &str, body: &str) -> anyhow::Result<Value>;
    async fn send_media(
        &self,
        chat_id: &str,
        media: MediaPayload,
        caption: Option<&str>,
    ) -> anyhow::Result<Value>;

    /// Fetch media from a URL into an engine-usable payload.
    async fn media_from_url(&self, url: &str, unsafe_mime: bool) -> anyhow::Result<MediaPayload>;

    async fn set_display_name(&self, name: &str) -> anyhow::Result<Value>;
    async fn set_profile_picture(&self, media: MediaPayload) -> anyhow::Result<Value>;

    /// Set the account's status text; with media attached this posts a
    /// status (story) update with the text as caption.
    async fn set_status(&self, text: &str, media: Option<MediaPayload>) -> anyhow::Result<Value>;
}

/// An event pushed by the engine's upstream connection.
///
/// The adapter resolves related entities (chat, contact) into snapshots
/// before the event reaches the relay, so the relay only sees normalized
/// data plus the opaque call handle.
pub enum EngineEvent {
    Qr {
        code: String,
    },
    Ready {
        info: Value,
    },
    AuthFailure {
        message: String,
    },
    Disconnected {
        reason: String,
    },
    /// An inbound message, with its chat and sender already resolved.
    Message {
        message: MessageSnapshot,
        chat: ChatSnapshot,
        contact: ContactSnapshot,
    },
    /// A message created on any device of the gateway's own account.
    MessageCreate {
        message: MessageSnapshot,
    },
    MessageEdit {
        message_id: String,
        new_body: String,
        old_body: String,
    },
    MessageReaction {
        reaction: String,
        message_id: String,
        sender_id: String,
    },
    MediaUploaded {
        message_id: String,
    },
    Call {
        call: CallSnapshot,
        handle: Arc<dyn CallRef>,
    },
}

impl EngineEvent {
    /// Upstream event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Qr { .. } => "qr",
            Self::Ready { .. } => "ready",
            Self::AuthFailure { .. } => "auth_failure",
            Self::Disconnected { .. } => "disconnected",
            Self::Message { .. } => "message",
            Self::MessageCreate { .. } => "message_create",
            Self::MessageEdit { .. } => "message_edit",
            Self::MessageReaction { .. } => "message_reaction",
            Self::MediaUploaded { .. } => "media_uploaded",
            Self::Call { .. } => "call",
        }
    }
}

/// Receiver for engine events, consumed by the gateway's relay.
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Sender side, held by engine adapter implementations.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Engine stand-in for wiring the gateway without a connected provider:
/// every lookup is absent, every operation fails.
pub struct NoopEngine;

#[async_trait]
impl ChatEngine for NoopEngine {
    async fn chat(&self, _chat_id: &str) -> anyhow::Result<Option<Arc<dyn ChatRef>>> {
        Ok(None)
    }

    async fn contact(&self, _contact_id: &str) -> anyhow::Result<Option<Arc<dyn ContactRef>>> {
        Ok(None)
    }

    async fn message(&self, _message_id: &str) -> anyhow::Result<Option<Arc<dyn MessageRef>>> {
        Ok(None)
    }

    async fn send_message(&self, _chat_id: &str, _body: &str) -> anyhow::Result<Value> {
        anyhow::bail!("no chat engine connected")
    }

    async fn send_media(
        &self,
        _chat_id: &str,
        _media: MediaPayload,
        _caption: Option<&str>,
    ) -> anyhow::Result<Value> {
        anyhow::bail!("no chat engine connected")
    }

    async fn media_from_url(
        &self,
        _url: &str,
        _unsafe_mime: bool,
    ) -> anyhow::Result<MediaPayload> {
        anyhow::bail!("no chat engine connected")
    }

    async fn set_display_name(&self, _name: &str) -> anyhow::Result<Value> {
        anyhow::bail!("no chat engine connected")
    }

    async fn set_profile_picture(&self, _media: MediaPayload) -> anyhow::Result<Value> {
        anyhow::bail!("no chat engine connected")
    }

    async fn set_status(&self, _text: &str, _media: Option<MediaPayload>) -> anyhow::Result<Value> {
        anyhow::bail!("no chat engine connected")
    }
}
