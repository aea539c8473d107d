//! Raw-message normalization.

use {
    guildsync_storage::{MessageSource, PersistedMessage},
    serde_json::Value,
};

use crate::types::Channel;

/// Flatten a raw Discord message into a storage row.
///
/// Total over arbitrary JSON: missing or oddly-typed fields become `None`
/// (or an empty `message_id`), and the untouched payload rides along in
/// `raw` so nothing is lost to the flattening.
#[must_use]
pub fn normalize(
    raw: &Value,
    channel: &Channel,
    guild_id: Option<&str>,
    source: MessageSource,
) -> PersistedMessage {
    let author = raw.get("author");
    PersistedMessage {
        source,
        guild_id: guild_id.map(str::to_string),
        channel_id: channel.id.clone(),
        channel_name: channel.name.clone(),
        author_id: field(author, "id"),
        author_username: field(author, "username"),
        message_id: raw
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        content: raw
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string),
        raw: raw.clone(),
    }
}

fn field(obj: Option<&Value>, key: &str) -> Option<String> {
    obj.and_then(|value| value.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}
