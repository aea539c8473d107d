//! Channel and guild discovery.

use std::sync::Arc;

use tracing::warn;

use crate::{
    api::{ApiClient, ListOutcome},
    error::{ApiError, Result},
    types::{Channel, ChannelList, Guild},
};

/// Lists the channels and guilds visible to the bot account.
pub struct ChannelDiscovery {
    api: Arc<ApiClient>,
}

impl ChannelDiscovery {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// List every channel of a guild, fetchable or not. Callers filter by
    /// [`crate::types::ChannelKind::is_fetchable`].
    pub async fn list_channels(&self, guild_id: &str) -> Result<ChannelList> {
        let outcome = self
            .api
            .get_list(&format!("guilds/{guild_id}/channels"))
            .await?;
        Ok(decode_channels(outcome))
    }

    /// List the bot's open direct-message channels.
    pub async fn list_dm_channels(&self) -> Result<ChannelList> {
        let outcome = self.api.get_list("users/@me/channels").await?;
        Ok(decode_channels(outcome))
    }

    /// List the guilds the bot account belongs to. Doubles as a cheap
    /// credential probe before a scheduled cycle fans out.
    pub async fn list_bot_guilds(&self) -> Result<Vec<Guild>> {
        match self.api.get_list("users/@me/guilds").await? {
            ListOutcome::Items(items) => Ok(items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect()),
            ListOutcome::Denied(reason) => Err(ApiError::AccessDenied { reason }),
            ListOutcome::Malformed(body) => {
                Err(ApiError::malformed(format!("users/@me/guilds: {body}")))
            },
        }
    }
}

fn decode_channels(outcome: ListOutcome) -> ChannelList {
    match outcome {
        ListOutcome::Items(items) => {
            let mut channels = Vec::with_capacity(items.len());
            for item in items {
                match serde_json::from_value::<Channel>(item.clone()) {
                    Ok(channel) => channels.push(channel),
                    Err(err) => {
                        warn!(error = %err, item = %item, "skipping unparseable channel entry");
                    },
                }
            }
            ChannelList::Listed(channels)
        },
        ListOutcome::Denied(reason) => ChannelList::Denied(reason),
        ListOutcome::Malformed(body) => ChannelList::Malformed(body),
    }
}
