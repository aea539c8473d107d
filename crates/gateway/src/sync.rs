//! Live [`SyncService`] backed by the sync engine.

use std::sync::Arc;

use {
    async_trait::async_trait,
    guildsync_discord::{SyncOrchestrator, SyncScheduler},
    guildsync_service_traits::{ServiceResult, SyncService},
};

/// Bridges the service trait onto the orchestrator and scheduler.
pub struct LiveSyncService {
    orchestrator: Arc<SyncOrchestrator>,
    scheduler: Arc<SyncScheduler>,
}

impl LiveSyncService {
    #[must_use]
    pub fn new(orchestrator: Arc<SyncOrchestrator>, scheduler: Arc<SyncScheduler>) -> Self {
        Self {
            orchestrator,
            scheduler,
        }
    }
}

#[async_trait]
impl SyncService for LiveSyncService {
    async fn trigger_guild_sync(&self, guild_id: &str) -> ServiceResult {
        self.scheduler.trigger_sync(guild_id);
        Ok(serde_json::json!({ "status": "accepted", "guild_id": guild_id }))
    }

    async fn sync_guild(&self, guild_id: &str) -> ServiceResult {
        let result = self
            .orchestrator
            .sync(guild_id)
            .await
            .map_err(|err| err.to_string())?;
        Ok(serde_json::to_value(result)?)
    }

    async fn sync_direct_messages(&self) -> ServiceResult {
        let result = self
            .orchestrator
            .sync_direct_messages()
            .await
            .map_err(|err| err.to_string())?;
        Ok(serde_json::to_value(result)?)
    }

    async fn guild_connected(&self, guild_id: &str) -> ServiceResult {
        let guilds = self
            .orchestrator
            .discovery()
            .list_bot_guilds()
            .await
            .map_err(|err| err.to_string())?;
        let connected = guilds.iter().any(|guild| guild.id == guild_id);
        Ok(serde_json::json!({ "guild_id": guild_id, "connected": connected }))
    }
}
