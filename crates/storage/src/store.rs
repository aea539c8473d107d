use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// Where a persisted message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    /// A guild channel.
    Discord,
    /// A direct-message channel.
    Dm,
}

impl MessageSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Dm => "dm",
        }
    }
}

/// Canonical persisted message row.
///
/// Uniqueness is keyed on `(channel_id, message_id)`; stores upsert on that
/// key so re-syncing an unchanged channel never duplicates rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedMessage {
    pub source: MessageSource,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub author_id: Option<String>,
    pub author_username: Option<String>,
    pub message_id: String,
    pub content: Option<String>,
    /// Full original payload, kept for forward compatibility.
    pub raw: serde_json::Value,
}

impl PersistedMessage {
    /// Dedup key for upserts.
    #[must_use]
    pub fn key(&self) -> (String, String) {
        (self.channel_id.clone(), self.message_id.clone())
    }
}

/// Per-user record of which guild was designated for syncing.
///
/// Written by the OAuth callback flow; the sync engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedGuildRecord {
    pub user_token: String,
    pub guild_ids_seen: Vec<String>,
    pub selected_guild: String,
}

/// Append-only row store for synced messages, upserting on
/// `(channel_id, message_id)`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn upsert(&self, message: PersistedMessage) -> Result<()>;
    async fn list_by_channel(&self, channel_id: &str, limit: u32) -> Result<Vec<PersistedMessage>>;
    async fn count(&self) -> Result<u64>;
}

/// Free-form event envelopes (webhook payloads, bot lifecycle events).
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: serde_json::Value) -> Result<()>;
    async fn list(&self, limit: u32) -> Result<Vec<serde_json::Value>>;
}

/// Durable record of guild selections made during the OAuth flow.
#[async_trait]
pub trait SelectedGuildRegistry: Send + Sync {
    /// Guild ids the scheduler should sync. Deduplicated, insertion order.
    async fn list_selected_guild_ids(&self) -> Result<Vec<String>>;
    async fn record_selection(&self, record: SelectedGuildRecord) -> Result<()>;
    async fn list_selections(&self) -> Result<Vec<SelectedGuildRecord>>;
}
