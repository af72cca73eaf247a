//! Persistence sink for broadcast events.
//!
//! The gateway writes through the [`EventStore`] trait; failures here are
//! logged by the caller and never block delivery to subscribers. Two
//! implementations ship: an in-memory store for tests and a JSONL-backed
//! store for the standalone binary.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatwireError, Result};
use crate::event::{CallSnapshot, ChatSnapshot, ContactSnapshot, MessageSnapshot, StatusEntry};

/// Accumulated status history for one contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub contact_id: String,
    pub contact_name: Option<String>,
    pub msgs: Vec<StatusEntry>,
    pub total_count: u64,
    pub timestamp: i64,
}

/// Write-side of the persistence sink.
///
/// Chats and contacts are upserts keyed by id. Statuses accumulate per
/// contact. Messages and calls are append-only.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    async fn upsert_chat(&self, chat: &ChatSnapshot) -> Result<()>;
    async fn upsert_contact(&self, contact: &ContactSnapshot) -> Result<()>;
    async fn append_status(
        &self,
        contact_id: &str,
        contact_name: Option<&str>,
        entry: &StatusEntry,
    ) -> Result<()>;
    async fn insert_message(&self, message: &MessageSnapshot) -> Result<()>;
    async fn insert_call(&self, call: &CallSnapshot) -> Result<()>;
}

fn apply_status(
    statuses: &mut HashMap<String, StatusRecord>,
    contact_id: &str,
    contact_name: Option<&str>,
    entry: &StatusEntry,
) {
    let record = statuses
        .entry(contact_id.to_string())
        .or_insert_with(|| StatusRecord {
            contact_id: contact_id.to_string(),
            contact_name: None,
            msgs: Vec::new(),
            total_count: 0,
            timestamp: 0,
        });
    record.msgs.push(entry.clone());
    record.total_count += 1;
    record.timestamp = entry.timestamp;
    record.contact_name = contact_name.map(str::to_string);
}

/// In-memory store, used by tests and as a fallback sink.
#[derive(Default)]
pub struct MemoryStore {
    chats: RwLock<HashMap<String, ChatSnapshot>>,
    contacts: RwLock<HashMap<String, ContactSnapshot>>,
    statuses: RwLock<HashMap<String, StatusRecord>>,
    messages: RwLock<Vec<MessageSnapshot>>,
    calls: RwLock<Vec<CallSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat(&self, id: &str) -> Option<ChatSnapshot> {
        self.chats.read().unwrap().get(id).cloned()
    }

    pub fn contact(&self, id: &str) -> Option<ContactSnapshot> {
        self.contacts.read().unwrap().get(id).cloned()
    }

    pub fn status(&self, contact_id: &str) -> Option<StatusRecord> {
        self.statuses.read().unwrap().get(contact_id).cloned()
    }

    pub fn messages(&self) -> Vec<MessageSnapshot> {
        self.messages.read().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<CallSnapshot> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn upsert_chat(&self, chat: &ChatSnapshot) -> Result<()> {
        self.chats
            .write()
            .unwrap()
            .insert(chat.id.clone(), chat.clone());
        Ok(())
    }

    async fn upsert_contact(&self, contact: &ContactSnapshot) -> Result<()> {
        self.contacts
            .write()
            .unwrap()
            .insert(contact.id.clone(), contact.clone());
        Ok(())
    }

    async fn append_status(
        &self,
        contact_id: &str,
        contact_name: Option<&str>,
        entry: &StatusEntry,
    ) -> Result<()> {
        apply_status(
            &mut self.statuses.write().unwrap(),
            contact_id,
            contact_name,
            entry,
        );
        Ok(())
    }

    async fn insert_message(&self, message: &MessageSnapshot) -> Result<()> {
        self.messages.write().unwrap().push(message.clone());
        Ok(())
    }

    async fn insert_call(&self, call: &CallSnapshot) -> Result<()> {
        self.calls.write().unwrap().push(call.clone());
        Ok(())
    }
}

/// Serialized index for the keyed collections.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreIndex {
    #[serde(default)]
    chats: HashMap<String, ChatSnapshot>,
    #[serde(default)]
    contacts: HashMap<String, ContactSnapshot>,
    #[serde(default)]
    statuses: HashMap<String, StatusRecord>,
}

/// File-backed store: a JSON index for the keyed collections plus
/// append-only JSONL logs for messages and calls.
pub struct JsonlEventStore {
    dir: PathBuf,
    index: RwLock<StoreIndex>,
}

impl JsonlEventStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let index_path = dir.join("index.json");
        let index = if index_path.exists() {
            let raw = std::fs::read_to_string(&index_path)?;
            serde_json::from_str(&raw)?
        } else {
            StoreIndex::default()
        };

        debug!(dir = %dir.display(), "opened event store");
        Ok(Self {
            dir,
            index: RwLock::new(index),
        })
    }

    /// Write the index atomically: temp file in the same directory, then
    /// rename over the old one.
    fn flush_index(&self) -> Result<()> {
        let index = self.index.read().unwrap();
        let json = serde_json::to_string_pretty(&*index)?;
        drop(index);

        let path = self.dir.join("index.json");
        let tmp = self.dir.join("index.json.tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn append_line(&self, name: &str, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(name))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn read_lines<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(path)?;
        raw.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(ChatwireError::Json))
            .collect()
    }

    pub fn chat(&self, id: &str) -> Option<ChatSnapshot> {
        self.index.read().unwrap().chats.get(id).cloned()
    }

    pub fn contact(&self, id: &str) -> Option<ContactSnapshot> {
        self.index.read().unwrap().contacts.get(id).cloned()
    }

    pub fn status(&self, contact_id: &str) -> Option<StatusRecord> {
        self.index.read().unwrap().statuses.get(contact_id).cloned()
    }

    pub fn messages(&self) -> Result<Vec<MessageSnapshot>> {
        self.read_lines("messages.jsonl")
    }

    pub fn calls(&self) -> Result<Vec<CallSnapshot>> {
        self.read_lines("calls.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl EventStore for JsonlEventStore {
    async fn upsert_chat(&self, chat: &ChatSnapshot) -> Result<()> {
        self.index
            .write()
            .unwrap()
            .chats
            .insert(chat.id.clone(), chat.clone());
        self.flush_index()
    }

    async fn upsert_contact(&self, contact: &ContactSnapshot) -> Result<()> {
        self.index
            .write()
            .unwrap()
            .contacts
            .insert(contact.id.clone(), contact.clone());
        self.flush_index()
    }

    async fn append_status(
        &self,
        contact_id: &str,
        contact_name: Option<&str>,
        entry: &StatusEntry,
    ) -> Result<()> {
        apply_status(
            &mut self.index.write().unwrap().statuses,
            contact_id,
            contact_name,
            entry,
        );
        self.flush_index()
    }

    async fn insert_message(&self, message: &MessageSnapshot) -> Result<()> {
        self.append_line("messages.jsonl", &serde_json::to_string(message)?)
    }

    async fn insert_call(&self, call: &CallSnapshot) -> Result<()> {
        self.append_line("calls.jsonl", &serde_json::to_string(call)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            is_status: true,
            links: vec![],
            mentioned_ids: vec![],
        }
    }

    fn chat(id: &str) -> ChatSnapshot {
        ChatSnapshot {
            id: id.into(),
            name: Some("Test Chat".into()),
            is_group: false,
            is_read_only: false,
            last_message_id: None,
            timestamp: Some(1_700_000_000),
        }
    }

    #[tokio::test]
    async fn test_memory_upsert_chat_replaces() {
        let store = MemoryStore::new();
        store.upsert_chat(&chat("1@c.us")).await.unwrap();

        let mut updated = chat("1@c.us");
        updated.name = Some("Renamed".into());
        store.upsert_chat(&updated).await.unwrap();

        assert_eq!(store.chat("1@c.us").unwrap().name.as_deref(), Some("Renamed"));
    }

    #[tokio::test]
    async fn test_memory_status_accumulates() {
        let store = MemoryStore::new();
        let first = StatusEntry::from_message(&message("s1", "one"));
        let second = StatusEntry::from_message(&message("s2", "two"));

        store
            .append_status("555@c.us", Some("Alice"), &first)
            .await
            .unwrap();
        store
            .append_status("555@c.us", Some("Alice"), &second)
            .await
            .unwrap();

        let record = store.status("555@c.us").unwrap();
        assert_eq!(record.total_count, 2);
        assert_eq!(record.msgs.len(), 2);
        assert_eq!(record.msgs[1].body, "two");
        assert_eq!(record.contact_name.as_deref(), Some("Alice"));
        assert_eq!(record.timestamp, second.timestamp);
    }

    #[tokio::test]
    async fn test_jsonl_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlEventStore::new(dir.path()).unwrap();
            store.upsert_chat(&chat("1@c.us")).await.unwrap();
            store.insert_message(&message("m1", "hello")).await.unwrap();
            store.insert_message(&message("m2", "again")).await.unwrap();
        }

        // reopen from disk
        let store = JsonlEventStore::new(dir.path()).unwrap();
        assert!(store.chat("1@c.us").is_some());
        let messages = store.messages().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "hello");
    }

    #[tokio::test]
    async fn test_jsonl_status_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlEventStore::new(dir.path()).unwrap();
            let entry = StatusEntry::from_message(&message("s1", "hi"));
            store
                .append_status("555@c.us", None, &entry)
                .await
                .unwrap();
        }

        let store = JsonlEventStore::new(dir.path()).unwrap();
        let record = store.status("555@c.us").unwrap();
        assert_eq!(record.total_count, 1);
        assert!(record.contact_name.is_none());
    }
}
