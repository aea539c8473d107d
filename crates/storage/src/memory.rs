//! In-memory stores for tests and standalone runs. No persistence.

use std::{
    collections::HashMap,
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    Result,
    store::{
        EventStore, MessageStore, PersistedMessage, SelectedGuildRecord, SelectedGuildRegistry,
    },
};

/// In-memory message store keyed on `(channel_id, message_id)`.
///
/// Insertion order is preserved so `list_by_channel` returns messages in the
/// order they were first synced.
#[derive(Default)]
pub struct MemoryMessageStore {
    inner: Mutex<MessageMap>,
}

#[derive(Default)]
struct MessageMap {
    rows: HashMap<(String, String), PersistedMessage>,
    order: Vec<(String, String)>,
}

impl MemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn upsert(&self, message: PersistedMessage) -> Result<()> {
        let key = message.key();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.rows.insert(key.clone(), message).is_none() {
            inner.order.push(key);
        }
        Ok(())
    }

    async fn list_by_channel(&self, channel_id: &str, limit: u32) -> Result<Vec<PersistedMessage>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .order
            .iter()
            .filter(|(cid, _)| cid == channel_id)
            .filter_map(|key| inner.rows.get(key).cloned())
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.rows.len() as u64)
    }
}

/// In-memory event envelope log.
#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<serde_json::Value>>,
}

impl MemoryEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: serde_json::Value) -> Result<()> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
        Ok(())
    }

    async fn list(&self, limit: u32) -> Result<Vec<serde_json::Value>> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let start = events.len().saturating_sub(limit as usize);
        Ok(events[start..].to_vec())
    }
}

/// In-memory guild-selection registry.
#[derive(Default)]
pub struct MemorySelectedGuildRegistry {
    selections: Mutex<Vec<SelectedGuildRecord>>,
}

impl MemorySelectedGuildRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for tests: pre-select the given guilds.
    #[must_use]
    pub fn with_guilds(guild_ids: &[&str]) -> Self {
        let selections = guild_ids
            .iter()
            .map(|gid| SelectedGuildRecord {
                user_token: String::new(),
                guild_ids_seen: vec![(*gid).to_string()],
                selected_guild: (*gid).to_string(),
            })
            .collect();
        Self {
            selections: Mutex::new(selections),
        }
    }
}

#[async_trait]
impl SelectedGuildRegistry for MemorySelectedGuildRegistry {
    async fn list_selected_guild_ids(&self) -> Result<Vec<String>> {
        let selections = self.selections.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = Vec::new();
        for record in selections.iter() {
            if !record.selected_guild.is_empty() && !ids.contains(&record.selected_guild) {
                ids.push(record.selected_guild.clone());
            }
        }
        Ok(ids)
    }

    async fn record_selection(&self, record: SelectedGuildRecord) -> Result<()> {
        let mut selections = self.selections.lock().unwrap_or_else(|e| e.into_inner());
        selections.push(record);
        Ok(())
    }

    async fn list_selections(&self) -> Result<Vec<SelectedGuildRecord>> {
        let selections = self.selections.lock().unwrap_or_else(|e| e.into_inner());
        Ok(selections.clone())
    }
}
