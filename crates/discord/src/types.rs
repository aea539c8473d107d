//! Channel, guild, and sync-result types.

use {
    guildsync_storage::MessageSource,
    serde::{Deserialize, Serialize},
};

/// Channel categories reported by the Discord API.
///
/// Only a subset carries readable message history; everything else maps to
/// [`ChannelKind::Other`] and is never queried for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ChannelKind {
    Text,
    Announcement,
    PublicThread,
    PrivateThread,
    VoiceText,
    Other(u8),
}

impl From<u8> for ChannelKind {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Text,
            5 => Self::Announcement,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            15 => Self::VoiceText,
            other => Self::Other(other),
        }
    }
}

impl From<ChannelKind> for u8 {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Text => 0,
            ChannelKind::Announcement => 5,
            ChannelKind::PublicThread => 11,
            ChannelKind::PrivateThread => 12,
            ChannelKind::VoiceText => 15,
            ChannelKind::Other(code) => code,
        }
    }
}

impl ChannelKind {
    /// Whether message history can be read from channels of this kind.
    #[must_use]
    pub fn is_fetchable(self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// A channel as returned by the channel-listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
}

/// A guild the bot account belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Channel-listing outcome, decided once at the parsing boundary instead of
/// ad hoc shape checks scattered through callers.
#[derive(Debug, Clone)]
pub enum ChannelList {
    /// The endpoint returned a channel array (possibly empty).
    Listed(Vec<Channel>),
    /// Discord answered with an error object ("Missing Access" and friends).
    Denied(String),
    /// The body was neither an array nor a recognizable error object.
    Malformed(serde_json::Value),
}

/// A channel-level failure recorded during a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelFailure {
    pub channel_id: String,
    pub error: String,
}

/// Aggregated outcome of one sync run for one guild (or the DM set).
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub source: MessageSource,
    pub guild_id: Option<String>,
    /// Count of fetchable channels discovery returned, whether or not the
    /// per-channel fetch succeeded.
    pub channels_scanned: usize,
    /// Messages fetched, normalized, and persisted across all channels.
    pub messages_saved: usize,
    /// Messages that fetched fine but failed to persist.
    pub persist_failures: usize,
    /// Per-channel failures, in discovery order.
    pub channel_errors: Vec<ChannelFailure>,
    /// Set when channel discovery itself failed; implies zero channels scanned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_error: Option<String>,
}

impl SyncResult {
    #[must_use]
    pub fn new(source: MessageSource, guild_id: Option<&str>) -> Self {
        Self {
            source,
            guild_id: guild_id.map(str::to_string),
            channels_scanned: 0,
            messages_saved: 0,
            persist_failures: 0,
            channel_errors: Vec::new(),
            discovery_error: None,
        }
    }
}
