//! Client command dispatch.
//!
//! Each inbound frame is parsed into the `{event, data}` envelope, mapped to
//! a [`CommandKind`], and run against the engine and ephemeral call store.
//! Every frame produces exactly one response envelope for the issuing
//! connection: `<command>_success` or `error`.
//!
//! Target lookups that come back absent answer `{success: true}` rather than
//! erroring; a missing target is not a failure for any command except
//! `reject_call` (the handle is gone, the reject cannot happen) and
//! `download_media` on a message without media.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use chatwire_core::error::{ChatwireError, Result};
use chatwire_core::protocol::Envelope;
use chatwire_core::provider::{ChatRef, ContactRef, MessageRef};

use crate::state::GatewayState;

/// The closed set of supported client commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    // statuses
    GetStatusChat,
    GetStatusContact,
    ShareStatusText,
    ShareStatusImage,
    ShareStatusVideo,
    ShareStatusAudio,
    // contacts
    BlockContact,
    UnblockContact,
    GetAbout,
    GetContactChat,
    GetCommonGroups,
    GetCountryCode,
    GetFormattedNumber,
    GetProfilePicUrl,
    // calls
    RejectCall,
    // chats
    ClearMessages,
    ClearState,
    DeleteChat,
    GetChatContact,
    SendMessage,
    SendMediaFromUrl,
    SendStateTyping,
    SyncHistory,
    // account
    SetDisplayName,
    SetProfilePicture,
    SetStatus,
    // messages
    DeleteMessage,
    DownloadMedia,
    EditMessage,
    GetMessageChat,
    GetMessageInfo,
    GetMessageReactions,
    ReactToMessage,
    ReplyToMessage,
}

impl CommandKind {
    pub fn parse(event: &str) -> Option<Self> {
        let kind = match event {
            "get_status_chat" => Self::GetStatusChat,
            "get_status_contact" => Self::GetStatusContact,
            "share_status_text" => Self::ShareStatusText,
            "share_status_image" => Self::ShareStatusImage,
            "share_status_video" => Self::ShareStatusVideo,
            "share_status_audio" => Self::ShareStatusAudio,
            "block_contact" => Self::BlockContact,
            "unblock_contact" => Self::UnblockContact,
            "get_about" => Self::GetAbout,
            "get_contact_chat" => Self::GetContactChat,
            "get_common_groups" => Self::GetCommonGroups,
            "get_country_code" => Self::GetCountryCode,
            "get_formatted_number" => Self::GetFormattedNumber,
            "get_profile_pic_url" => Self::GetProfilePicUrl,
            "reject_call" => Self::RejectCall,
            "clear_messages" => Self::ClearMessages,
            "clear_state" => Self::ClearState,
            "delete_chat" => Self::DeleteChat,
            "get_chat_contact" => Self::GetChatContact,
            "send_message" => Self::SendMessage,
            "send_media_from_url" => Self::SendMediaFromUrl,
            "send_state_typing" => Self::SendStateTyping,
            "sync_history" => Self::SyncHistory,
            "set_display_name" => Self::SetDisplayName,
            "set_profile_picture" => Self::SetProfilePicture,
            "set_status" => Self::SetStatus,
            "delete_message" => Self::DeleteMessage,
            "download_media" => Self::DownloadMedia,
            "edit_message" => Self::EditMessage,
            "get_message_chat" => Self::GetMessageChat,
            "get_message_info" => Self::GetMessageInfo,
            "get_message_reactions" => Self::GetMessageReactions,
            "react_to_message" => Self::ReactToMessage,
            "reply_to_message" => Self::ReplyToMessage,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetStatusChat => "get_status_chat",
            Self::GetStatusContact => "get_status_contact",
            Self::ShareStatusText => "share_status_text",
            Self::ShareStatusImage => "share_status_image",
            Self::ShareStatusVideo => "share_status_video",
            Self::ShareStatusAudio => "share_status_audio",
            Self::BlockContact => "block_contact",
            Self::UnblockContact => "unblock_contact",
            Self::GetAbout => "get_about",
            Self::GetContactChat => "get_contact_chat",
            Self::GetCommonGroups => "get_common_groups",
            Self::GetCountryCode => "get_country_code",
            Self::GetFormattedNumber => "get_formatted_number",
            Self::GetProfilePicUrl => "get_profile_pic_url",
            Self::RejectCall => "reject_call",
            Self::ClearMessages => "clear_messages",
            Self::ClearState => "clear_state",
            Self::DeleteChat => "delete_chat",
            Self::GetChatContact => "get_chat_contact",
            Self::SendMessage => "send_message",
            Self::SendMediaFromUrl => "send_media_from_url",
            Self::SendStateTyping => "send_state_typing",
            Self::SyncHistory => "sync_history",
            Self::SetDisplayName => "set_display_name",
            Self::SetProfilePicture => "set_profile_picture",
            Self::SetStatus => "set_status",
            Self::DeleteMessage => "delete_message",
            Self::DownloadMedia => "download_media",
            Self::EditMessage => "edit_message",
            Self::GetMessageChat => "get_message_chat",
            Self::GetMessageInfo => "get_message_info",
            Self::GetMessageReactions => "get_message_reactions",
            Self::ReactToMessage => "react_to_message",
            Self::ReplyToMessage => "reply_to_message",
        }
    }
}

/// Handle one inbound frame, producing the single response envelope for the
/// issuing connection.
pub async fn dispatch_command(state: &GatewayState, raw: &str) -> Envelope {
    let envelope: Envelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "malformed command frame");
            let err = ChatwireError::Parse(e.to_string());
            return Envelope::error(&err.to_string(), None);
        }
    };

    let Some(kind) = CommandKind::parse(&envelope.event) else {
        warn!(event = %envelope.event, "unknown command");
        return Envelope::error(&ChatwireError::UnknownCommand.to_string(), None);
    };

    debug!(command = kind.name(), "dispatching command");
    match run_command(state, kind, &envelope.data).await {
        // A handler with nothing to report (absent target, side-effect-only
        // operation) still acknowledges the command.
        Ok(None) => Envelope::success(kind.name(), json!({"success": true})),
        Ok(Some(result)) => Envelope::success(kind.name(), result),
        Err(e) => {
            warn!(command = kind.name(), error = %e, "command failed");
            error_response(&e)
        }
    }
}

fn error_response(err: &ChatwireError) -> Envelope {
    let detail = match err {
        ChatwireError::Engine(_) | ChatwireError::Other(_) => Some(format!("{err:?}")),
        _ => None,
    };
    Envelope::error(&err.to_string(), detail.as_deref())
}

async fn run_command(
    state: &GatewayState,
    kind: CommandKind,
    data: &Value,
) -> Result<Option<Value>> {
    match kind {
        // ---- statuses ----
        CommandKind::GetStatusChat => match status_message(state, data).await? {
            Some(message) => Ok(Some(message.chat().await.map_err(engine_err)?)),
            None => Ok(None),
        },
        CommandKind::GetStatusContact => match status_message(state, data).await? {
            Some(message) => Ok(Some(message.contact().await.map_err(engine_err)?)),
            None => Ok(None),
        },
        CommandKind::ShareStatusText => {
            let text = require_str(data, "text")?;
            let result = state
                .engine
                .set_status(text, None)
                .await
                .map_err(engine_err)?;
            Ok(Some(result))
        }
        CommandKind::ShareStatusImage
        | CommandKind::ShareStatusVideo
        | CommandKind::ShareStatusAudio => {
            let url = require_str(data, "url")?;
            let caption = opt_str(data, "caption").unwrap_or("");
            // status media may carry mimetypes the engine would otherwise
            // refuse to fetch
            let media = state
                .engine
                .media_from_url(url, true)
                .await
                .map_err(engine_err)?;
            let result = state
                .engine
                .set_status(caption, Some(media))
                .await
                .map_err(engine_err)?;
            Ok(Some(result))
        }

        // ---- contacts ----
        CommandKind::BlockContact => contact_op(state, data, |c| async move {
            c.block().await
        })
        .await,
        CommandKind::UnblockContact => contact_op(state, data, |c| async move {
            c.unblock().await
        })
        .await,
        CommandKind::GetAbout => contact_op(state, data, |c| async move {
            c.about().await
        })
        .await,
        CommandKind::GetContactChat => contact_op(state, data, |c| async move {
            c.chat().await
        })
        .await,
        CommandKind::GetCommonGroups => contact_op(state, data, |c| async move {
            c.common_groups().await
        })
        .await,
        CommandKind::GetCountryCode => contact_op(state, data, |c| async move {
            c.country_code().await
        })
        .await,
        CommandKind::GetFormattedNumber => contact_op(state, data, |c| async move {
            c.formatted_number().await
        })
        .await,
        CommandKind::GetProfilePicUrl => contact_op(state, data, |c| async move {
            c.profile_pic_url().await
        })
        .await,

        // ---- calls ----
        CommandKind::RejectCall => {
            let call_id = require_str(data, "callId")?;
            let handle = state.calls.take(call_id).ok_or_else(|| {
                ChatwireError::TargetNotFound("Call not found or already ended.".to_string())
            })?;
            handle.reject().await.map_err(engine_err)?;
            Ok(None)
        }

        // ---- chats ----
        CommandKind::ClearMessages => chat_op(state, data, |c| async move {
            c.clear_messages().await
        })
        .await,
        CommandKind::ClearState => chat_op(state, data, |c| async move {
            c.clear_state().await
        })
        .await,
        CommandKind::DeleteChat => chat_op(state, data, |c| async move {
            c.delete().await
        })
        .await,
        CommandKind::GetChatContact => chat_op(state, data, |c| async move {
            c.contact().await
        })
        .await,
        CommandKind::SendStateTyping => chat_op(state, data, |c| async move {
            c.send_state_typing().await
        })
        .await,
        CommandKind::SyncHistory => chat_op(state, data, |c| async move {
            c.sync_history().await
        })
        .await,
        CommandKind::SendMessage => {
            let chat_id = require_str(data, "chatId")?;
            let message = require_str(data, "message")?;
            let result = state
                .engine
                .send_message(chat_id, message)
                .await
                .map_err(engine_err)?;
            Ok(Some(result))
        }
        CommandKind::SendMediaFromUrl => {
            let chat_id = require_str(data, "chatId")?;
            let url = require_str(data, "url")?;
            let caption = opt_str(data, "caption");
            let unsafe_mime = opt_bool(data, "unsafeMime").unwrap_or(false);
            let media = state
                .engine
                .media_from_url(url, unsafe_mime)
                .await
                .map_err(engine_err)?;
            let result = state
                .engine
                .send_media(chat_id, media, caption)
                .await
                .map_err(engine_err)?;
            Ok(Some(result))
        }

        // ---- account ----
        CommandKind::SetDisplayName => {
            let name = require_str(data, "name")?;
            let result = state.engine.set_display_name(name).await.map_err(engine_err)?;
            Ok(Some(result))
        }
        CommandKind::SetProfilePicture => {
            let url = require_str(data, "url")?;
            let media = state
                .engine
                .media_from_url(url, false)
                .await
                .map_err(engine_err)?;
            let result = state
                .engine
                .set_profile_picture(media)
                .await
                .map_err(engine_err)?;
            Ok(Some(result))
        }
        CommandKind::SetStatus => {
            let status = require_str(data, "status")?;
            let result = state
                .engine
                .set_status(status, None)
                .await
                .map_err(engine_err)?;
            Ok(Some(result))
        }

        // ---- messages ----
        CommandKind::DeleteMessage => {
            let for_everyone = opt_bool(data, "forEveryone").unwrap_or(false);
            message_op(state, data, "messageId", move |m| async move {
                m.delete(for_everyone).await
            })
            .await
        }
        CommandKind::DownloadMedia => {
            match lookup_message(state, data, "messageId").await? {
                Some(message) => {
                    if !message.has_media() {
                        return Err(ChatwireError::TargetNotFound(
                            "Message has no media.".to_string(),
                        ));
                    }
                    let media = message.download_media().await.map_err(engine_err)?;
                    Ok(Some(serde_json::to_value(media)?))
                }
                None => Ok(None),
            }
        }
        CommandKind::EditMessage => {
            let new_content = require_str(data, "newContent")?.to_string();
            message_op(state, data, "messageId", move |m| async move {
                m.edit(&new_content).await
            })
            .await
        }
        CommandKind::GetMessageChat => message_op(state, data, "messageId", |m| async move {
            m.chat().await
        })
        .await,
        CommandKind::GetMessageInfo => message_op(state, data, "messageId", |m| async move {
            m.info().await
        })
        .await,
        CommandKind::GetMessageReactions => {
            message_op(state, data, "messageId", |m| async move {
                m.reactions().await
            })
            .await
        }
        CommandKind::ReactToMessage => {
            let reaction = require_str(data, "reaction")?.to_string();
            message_op(state, data, "messageId", move |m| async move {
                m.react(&reaction).await
            })
            .await
        }
        CommandKind::ReplyToMessage => {
            let reply = require_str(data, "replyContent")?.to_string();
            message_op(state, data, "messageId", move |m| async move {
                m.reply(&reply).await
            })
            .await
        }
    }
}

fn engine_err(e: anyhow::Error) -> ChatwireError {
    ChatwireError::Engine(format!("{e:#}"))
}

fn require_str<'a>(data: &'a Value, key: &str) -> Result<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ChatwireError::InvalidParams(format!("missing field: {key}")))
}

fn opt_str<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

fn opt_bool(data: &Value, key: &str) -> Option<bool> {
    data.get(key).and_then(Value::as_bool)
}

async fn lookup_chat(state: &GatewayState, data: &Value) -> Result<Option<Arc<dyn ChatRef>>> {
    let chat_id = require_str(data, "chatId")?;
    state.engine.chat(chat_id).await.map_err(engine_err)
}

async fn lookup_contact(
    state: &GatewayState,
    data: &Value,
) -> Result<Option<Arc<dyn ContactRef>>> {
    let contact_id = require_str(data, "contactId")?;
    state.engine.contact(contact_id).await.map_err(engine_err)
}

async fn lookup_message(
    state: &GatewayState,
    data: &Value,
    key: &str,
) -> Result<Option<Arc<dyn MessageRef>>> {
    let message_id = require_str(data, key)?;
    state.engine.message(message_id).await.map_err(engine_err)
}

/// Status posts are addressed by message id.
async fn status_message(
    state: &GatewayState,
    data: &Value,
) -> Result<Option<Arc<dyn MessageRef>>> {
    lookup_message(state, data, "statusId").await
}

async fn chat_op<F, Fut>(state: &GatewayState, data: &Value, op: F) -> Result<Option<Value>>
where
    F: FnOnce(Arc<dyn ChatRef>) -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
{
    match lookup_chat(state, data).await? {
        Some(chat) => Ok(Some(op(chat).await.map_err(engine_err)?)),
        None => Ok(None),
    }
}

async fn contact_op<F, Fut>(state: &GatewayState, data: &Value, op: F) -> Result<Option<Value>>
where
    F: FnOnce(Arc<dyn ContactRef>) -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
{
    match lookup_contact(state, data).await? {
        Some(contact) => Ok(Some(op(contact).await.map_err(engine_err)?)),
        None => Ok(None),
    }
}

async fn message_op<F, Fut>(
    state: &GatewayState,
    data: &Value,
    key: &str,
    op: F,
) -> Result<Option<Value>>
where
    F: FnOnce(Arc<dyn MessageRef>) -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
{
    match lookup_message(state, data, key).await? {
        Some(message) => Ok(Some(op(message).await.map_err(engine_err)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use chatwire_core::config::Config;
    use chatwire_core::provider::{
        CallRef, ChatEngine, ContactRef, MediaPayload, NoopEngine,
    };
    use chatwire_core::store::MemoryStore;

    struct FakeContact;

    #[async_trait]
    impl ContactRef for FakeContact {
        async fn block(&self) -> anyhow::Result<Value> {
            Ok(json!({"blocked": true}))
        }
        async fn unblock(&self) -> anyhow::Result<Value> {
            Ok(json!({"blocked": false}))
        }
        async fn about(&self) -> anyhow::Result<Value> {
            Ok(json!("busy"))
        }
        async fn chat(&self) -> anyhow::Result<Value> {
            Ok(json!({"id": "555@c.us"}))
        }
        async fn common_groups(&self) -> anyhow::Result<Value> {
            Ok(json!([]))
        }
        async fn country_code(&self) -> anyhow::Result<Value> {
            Ok(json!("49"))
        }
        async fn formatted_number(&self) -> anyhow::Result<Value> {
            Ok(json!("+49 555"))
        }
        async fn profile_pic_url(&self) -> anyhow::Result<Value> {
            Ok(json!("https://example.com/pic.jpg"))
        }
    }

    struct FakeMessage {
        has_media: bool,
    }

    #[async_trait]
    impl chatwire_core::provider::MessageRef for FakeMessage {
        fn has_media(&self) -> bool {
            self.has_media
        }
        async fn chat(&self) -> anyhow::Result<Value> {
            Ok(json!({"id": "555@c.us"}))
        }
        async fn contact(&self) -> anyhow::Result<Value> {
            Ok(json!({"id": "555@c.us"}))
        }
        async fn delete(&self, for_everyone: bool) -> anyhow::Result<Value> {
            Ok(json!({"forEveryone": for_everyone}))
        }
        async fn download_media(&self) -> anyhow::Result<MediaPayload> {
            Ok(MediaPayload {
                mimetype: "image/png".into(),
                data: "aGVsbG8=".into(),
                filename: Some("pic.png".into()),
                filesize: None,
            })
        }
        async fn edit(&self, new_content: &str) -> anyhow::Result<Value> {
            Ok(json!({"body": new_content}))
        }
        async fn info(&self) -> anyhow::Result<Value> {
            Ok(json!({"delivery": []}))
        }
        async fn reactions(&self) -> anyhow::Result<Value> {
            Ok(json!([]))
        }
        async fn react(&self, reaction: &str) -> anyhow::Result<Value> {
            Ok(json!({"reaction": reaction}))
        }
        async fn reply(&self, content: &str) -> anyhow::Result<Value> {
            Ok(json!({"body": content}))
        }
    }

    /// Engine with one known contact and one known message.
    struct MockEngine;

    #[async_trait]
    impl ChatEngine for MockEngine {
        async fn chat(&self, _id: &str) -> anyhow::Result<Option<Arc<dyn ChatRef>>> {
            Ok(None)
        }
        async fn contact(&self, id: &str) -> anyhow::Result<Option<Arc<dyn ContactRef>>> {
            if id == "555@c.us" {
                Ok(Some(Arc::new(FakeContact)))
            } else {
                Ok(None)
            }
        }
        async fn message(
            &self,
            id: &str,
        ) -> anyhow::Result<Option<Arc<dyn chatwire_core::provider::MessageRef>>> {
            match id {
                "m-media" => Ok(Some(Arc::new(FakeMessage { has_media: true }))),
                "m-text" => Ok(Some(Arc::new(FakeMessage { has_media: false }))),
                _ => Ok(None),
            }
        }
        async fn send_message(&self, chat_id: &str, body: &str) -> anyhow::Result<Value> {
            Ok(json!({"to": chat_id, "body": body, "id": "sent-1"}))
        }
        async fn send_media(
            &self,
            chat_id: &str,
            media: MediaPayload,
            caption: Option<&str>,
        ) -> anyhow::Result<Value> {
            Ok(json!({"to": chat_id, "mimetype": media.mimetype, "caption": caption}))
        }
        async fn media_from_url(
            &self,
            url: &str,
            unsafe_mime: bool,
        ) -> anyhow::Result<MediaPayload> {
            // echo the flag through the mimetype so tests can observe it
            let mimetype = if unsafe_mime {
                "application/octet-stream"
            } else {
                "image/jpeg"
            };
            Ok(MediaPayload {
                mimetype: mimetype.into(),
                data: "ZmFrZQ==".into(),
                filename: Some(url.rsplit('/').next().unwrap_or("file").into()),
                filesize: None,
            })
        }
        async fn set_display_name(&self, name: &str) -> anyhow::Result<Value> {
            Ok(json!({"name": name}))
        }
        async fn set_profile_picture(&self, _media: MediaPayload) -> anyhow::Result<Value> {
            Ok(json!({"updated": true}))
        }
        async fn set_status(
            &self,
            text: &str,
            media: Option<MediaPayload>,
        ) -> anyhow::Result<Value> {
            Ok(json!({
                "status": text,
                "mediaMimetype": media.map(|m| m.mimetype),
            }))
        }
    }

    fn state_with(engine: Arc<dyn ChatEngine>) -> Arc<GatewayState> {
        GatewayState::new(Config::default(), engine, Arc::new(MemoryStore::new()))
    }

    async fn dispatch(state: &GatewayState, raw: &str) -> Value {
        serde_json::to_value(dispatch_command(state, raw).await).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(&state, r#"{"event":"warp_drive","data":{}}"#).await;
        assert_eq!(resp["event"], "error");
        assert_eq!(resp["data"]["message"], "Unknown event type");
    }

    #[tokio::test]
    async fn test_malformed_frame() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(&state, "this is not json").await;
        assert_eq!(resp["event"], "error");
        assert!(
            resp["data"]["message"]
                .as_str()
                .unwrap()
                .starts_with("Invalid command envelope")
        );
    }

    #[tokio::test]
    async fn test_send_message_success() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(
            &state,
            r#"{"event":"send_message","data":{"chatId":"123@c.us","message":"hi"}}"#,
        )
        .await;
        assert_eq!(resp["event"], "send_message_success");
        assert_eq!(resp["data"]["to"], "123@c.us");
        assert_eq!(resp["data"]["body"], "hi");
    }

    #[tokio::test]
    async fn test_send_message_missing_field() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(&state, r#"{"event":"send_message","data":{"chatId":"1"}}"#).await;
        assert_eq!(resp["event"], "error");
        assert_eq!(resp["data"]["message"], "Invalid params: missing field: message");
    }

    #[tokio::test]
    async fn test_block_contact_idempotent() {
        let state = state_with(Arc::new(MockEngine));
        let raw = r#"{"event":"block_contact","data":{"contactId":"555@c.us"}}"#;
        let first = dispatch(&state, raw).await;
        let second = dispatch(&state, raw).await;
        assert_eq!(first["event"], "block_contact_success");
        assert_eq!(second["event"], "block_contact_success");
    }

    #[tokio::test]
    async fn test_absent_contact_degrades_to_success() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(
            &state,
            r#"{"event":"get_about","data":{"contactId":"nobody@c.us"}}"#,
        )
        .await;
        assert_eq!(resp["event"], "get_about_success");
        assert_eq!(resp["data"], json!({"success": true}));
    }

    #[tokio::test]
    async fn test_reject_call_not_found() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(&state, r#"{"event":"reject_call","data":{"callId":"abc"}}"#).await;
        assert_eq!(resp["event"], "error");
        assert_eq!(resp["data"]["message"], "Call not found or already ended.");
    }

    #[tokio::test]
    async fn test_reject_call_consumes_handle() {
        struct CountingCall;

        #[async_trait]
        impl CallRef for CountingCall {
            async fn reject(&self) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let state = state_with(Arc::new(MockEngine));
        state.calls.put("call-1".into(), Arc::new(CountingCall));

        let raw = r#"{"event":"reject_call","data":{"callId":"call-1"}}"#;
        let first = dispatch(&state, raw).await;
        assert_eq!(first["event"], "reject_call_success");
        assert_eq!(first["data"], json!({"success": true}));

        let second = dispatch(&state, raw).await;
        assert_eq!(second["event"], "error");
        assert_eq!(second["data"]["message"], "Call not found or already ended.");
    }

    #[tokio::test]
    async fn test_download_media_without_media() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(
            &state,
            r#"{"event":"download_media","data":{"messageId":"m-text"}}"#,
        )
        .await;
        assert_eq!(resp["event"], "error");
        assert_eq!(resp["data"]["message"], "Message has no media.");
    }

    #[tokio::test]
    async fn test_download_media_success() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(
            &state,
            r#"{"event":"download_media","data":{"messageId":"m-media"}}"#,
        )
        .await;
        assert_eq!(resp["event"], "download_media_success");
        assert_eq!(resp["data"]["mimetype"], "image/png");
        assert_eq!(resp["data"]["data"], "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_share_status_text_sets_status() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(
            &state,
            r#"{"event":"share_status_text","data":{"text":"out of office"}}"#,
        )
        .await;
        assert_eq!(resp["event"], "share_status_text_success");
        assert_eq!(resp["data"]["status"], "out of office");
        assert!(resp["data"]["mediaMimetype"].is_null());
    }

    #[tokio::test]
    async fn test_share_status_image_posts_media_status() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(
            &state,
            r#"{"event":"share_status_image","data":{"url":"https://example.com/a.jpg","caption":"look"}}"#,
        )
        .await;
        assert_eq!(resp["event"], "share_status_image_success");
        assert_eq!(resp["data"]["status"], "look");
        // media statuses always fetch with the permissive mime option
        assert_eq!(resp["data"]["mediaMimetype"], "application/octet-stream");
    }

    #[tokio::test]
    async fn test_share_status_image_caption_defaults_empty() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(
            &state,
            r#"{"event":"share_status_video","data":{"url":"https://example.com/v.mp4"}}"#,
        )
        .await;
        assert_eq!(resp["event"], "share_status_video_success");
        assert_eq!(resp["data"]["status"], "");
    }

    #[tokio::test]
    async fn test_react_to_message() {
        let state = state_with(Arc::new(MockEngine));
        let resp = dispatch(
            &state,
            r#"{"event":"react_to_message","data":{"messageId":"m-text","reaction":"👍"}}"#,
        )
        .await;
        assert_eq!(resp["event"], "react_to_message_success");
        assert_eq!(resp["data"]["reaction"], "👍");
    }

    #[tokio::test]
    async fn test_engine_failure_surfaces_as_error() {
        let state = state_with(Arc::new(NoopEngine));
        let resp = dispatch(
            &state,
            r#"{"event":"send_message","data":{"chatId":"1","message":"x"}}"#,
        )
        .await;
        assert_eq!(resp["event"], "error");
        assert!(
            resp["data"]["message"]
                .as_str()
                .unwrap()
                .contains("no chat engine connected")
        );
    }

    #[tokio::test]
    async fn test_every_command_name_round_trips() {
        let names = [
            "get_status_chat",
            "get_status_contact",
            "share_status_text",
            "share_status_image",
            "share_status_video",
            "share_status_audio",
            "block_contact",
            "unblock_contact",
            "get_about",
            "get_contact_chat",
            "get_common_groups",
            "get_country_code",
            "get_formatted_number",
            "get_profile_pic_url",
            "reject_call",
            "clear_messages",
            "clear_state",
            "delete_chat",
            "get_chat_contact",
            "send_message",
            "send_media_from_url",
            "send_state_typing",
            "sync_history",
            "set_display_name",
            "set_profile_picture",
            "set_status",
            "delete_message",
            "download_media",
            "edit_message",
            "get_message_chat",
            "get_message_info",
            "get_message_reactions",
            "react_to_message",
            "reply_to_message",
        ];
        for name in names {
            let kind = CommandKind::parse(name).unwrap_or_else(|| panic!("unmapped: {name}"));
            assert_eq!(kind.name(), name);
        }
    }
}
