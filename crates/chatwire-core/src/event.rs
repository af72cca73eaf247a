//! Normalized domain events and entity snapshots.
//!
//! Snapshots carry only primitive fields extracted from the automation
//! engine's entities — raw engine objects never cross the gateway boundary.
//! Field names are camelCase on the wire to match the envelope protocol's
//! JavaScript clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current state of a chat, re-broadcast in full on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    pub id: String,
    pub name: Option<String>,
    pub is_group: bool,
    pub is_read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<String>,
    pub timestamp: Option<i64>,
}

/// Current state of a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSnapshot {
    pub id: String,
    pub name: Option<String>,
    pub number: Option<String>,
    pub pushname: Option<String>,
    pub short_name: Option<String>,
    pub is_blocked: bool,
    pub is_business: bool,
    pub is_enterprise: bool,
    pub is_group: bool,
    pub is_me: bool,
    pub is_my_contact: bool,
    pub is_user: bool,
    // serde's camelCase would lowercase the acronym
    #[serde(rename = "isWAContact")]
    pub is_wa_contact: bool,
    /// Business profile details, present only for business accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_profile: Option<Value>,
}

impl ContactSnapshot {
    /// Preferred display name: address-book name, falling back to pushname.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.pushname.as_deref())
    }
}

/// A message, keyed by its engine-stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnapshot {
    pub id: String,
    pub from: String,
    pub to: String,
    pub from_me: bool,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: i64,
    pub has_media: bool,
    pub has_quoted_msg: bool,
    pub has_reaction: bool,
    pub is_status: bool,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub mentioned_ids: Vec<String>,
}

/// One entry in a sender's accumulating status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub id: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: i64,
    pub has_media: bool,
}

impl StatusEntry {
    pub fn from_message(message: &MessageSnapshot) -> Self {
        Self {
            id: message.id.clone(),
            body: message.body.clone(),
            kind: message.kind.clone(),
            timestamp: message.timestamp,
            has_media: message.has_media,
        }
    }
}

/// An incoming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSnapshot {
    pub id: String,
    pub from: String,
    pub from_me: bool,
    pub is_group: bool,
    pub is_video: bool,
    pub can_handle_locally: bool,
    pub web_client_should_handle: bool,
    #[serde(default)]
    pub participants: Vec<String>,
    pub timestamp: i64,
}

/// A domain event broadcast to every connected subscriber.
///
/// Serializes directly to the `{event, data}` envelope: the variant tag is
/// the `event` kind, the payload is `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DomainEvent {
    Qr(String),
    /// Engine connection info, forwarded as-is.
    Ready(Value),
    AuthFailure(String),
    Disconnected(String),
    ChatUpdate(ChatSnapshot),
    ContactUpdate(ContactSnapshot),
    #[serde(rename_all = "camelCase")]
    NewStatus {
        contact_id: String,
        update: StatusEntry,
    },
    NewMessage(MessageSnapshot),
    IncomingCall(CallSnapshot),
    #[serde(rename_all = "camelCase")]
    MediaUploaded {
        message_id: String,
    },
    #[serde(rename_all = "camelCase")]
    MessageCreate {
        id: String,
        from: String,
        to: String,
        body: String,
        #[serde(rename = "type")]
        kind: String,
    },
    #[serde(rename_all = "camelCase")]
    MessageEdit {
        message_id: String,
        new_body: String,
        old_body: String,
    },
    #[serde(rename_all = "camelCase")]
    MessageReaction {
        reaction: String,
        msg_id: String,
        sender_id: String,
    },
}

impl DomainEvent {
    /// The wire-level event kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Qr(_) => "qr",
            Self::Ready(_) => "ready",
            Self::AuthFailure(_) => "auth_failure",
            Self::Disconnected(_) => "disconnected",
            Self::ChatUpdate(_) => "chat_update",
            Self::ContactUpdate(_) => "contact_update",
            Self::NewStatus { .. } => "new_status",
            Self::NewMessage(_) => "new_message",
            Self::IncomingCall(_) => "incoming_call",
            Self::MediaUploaded { .. } => "media_uploaded",
            Self::MessageCreate { .. } => "message_create",
            Self::MessageEdit { .. } => "message_edit",
            Self::MessageReaction { .. } => "message_reaction",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(id: &str, body: &str) -> MessageSnapshot {
        MessageSnapshot {
            id: id.into(),
            from: "555@c.us".into(),
            to: "me@c.us".into(),
            from_me: false,
            body: body.into(),
            kind: "chat".into(),
            timestamp: 1_700_000_000,
            has_media: false,
            has_quoted_msg: false,
            has_reaction: false,
            is_status: false,
            links: vec![],
            mentioned_ids: vec![],
        }
    }

    #[test]
    fn test_qr_wire_shape() {
        let wire = serde_json::to_value(DomainEvent::Qr("code-123".into())).unwrap();
        assert_eq!(wire, json!({"event": "qr", "data": "code-123"}));
    }

    #[test]
    fn test_new_status_wire_shape() {
        let event = DomainEvent::NewStatus {
            contact_id: "555@c.us".into(),
            update: StatusEntry::from_message(&message("s1", "hello")),
        };
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["event"], "new_status");
        assert_eq!(wire["data"]["contactId"], "555@c.us");
        assert_eq!(wire["data"]["update"]["body"], "hello");
        assert_eq!(wire["data"]["update"]["type"], "chat");
    }

    #[test]
    fn test_message_snapshot_camel_case() {
        let wire = serde_json::to_value(message("m1", "hi")).unwrap();
        assert_eq!(wire["fromMe"], false);
        assert_eq!(wire["hasMedia"], false);
        assert_eq!(wire["type"], "chat");
        assert!(wire.get("has_media").is_none());
    }

    #[test]
    fn test_message_reaction_wire_shape() {
        let event = DomainEvent::MessageReaction {
            reaction: "👍".into(),
            msg_id: "m1".into(),
            sender_id: "555@c.us".into(),
        };
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["event"], "message_reaction");
        assert_eq!(wire["data"]["msgId"], "m1");
        assert_eq!(wire["data"]["senderId"], "555@c.us");
    }

    #[test]
    fn test_kind_matches_tag() {
        let event = DomainEvent::Disconnected("logout".into());
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["event"], event.kind());
    }

    #[test]
    fn test_contact_display_name_and_wire_names() {
        let contact = ContactSnapshot {
            id: "1@c.us".into(),
            name: None,
            number: Some("1".into()),
            pushname: Some("Push".into()),
            short_name: None,
            is_blocked: false,
            is_business: false,
            is_enterprise: false,
            is_group: false,
            is_me: false,
            is_my_contact: false,
            is_user: true,
            is_wa_contact: true,
            business_profile: None,
        };
        assert_eq!(contact.display_name(), Some("Push"));

        let wire = serde_json::to_value(&contact).unwrap();
        assert_eq!(wire["isWAContact"], true);
        assert!(wire.get("isWaContact").is_none());
    }
}
