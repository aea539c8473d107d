//! Periodic sync loop and fire-and-forget manual triggers.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    guildsync_storage::SelectedGuildRegistry,
    tracing::{debug, error, info, warn},
};

use crate::sync::SyncOrchestrator;

/// Drives sync cycles on a fixed interval.
///
/// The cycle cadence is interval-after-completion: the full interval elapses
/// between the end of one cycle and the start of the next, so a slow cycle
/// never stacks up behind itself.
pub struct SyncScheduler {
    orchestrator: Option<Arc<SyncOrchestrator>>,
    registry: Arc<dyn SelectedGuildRegistry>,
    interval: Duration,
    started: AtomicBool,
}

impl SyncScheduler {
    /// `orchestrator` is `None` when no bot token is configured; the loop
    /// still runs but every cycle is a no-op with a warning.
    #[must_use]
    pub fn new(
        orchestrator: Option<Arc<SyncOrchestrator>>,
        registry: Arc<dyn SelectedGuildRegistry>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            registry,
            interval,
            started: AtomicBool::new(false),
        })
    }

    /// Spawn the background loop. Returns `false` if it was already started;
    /// at most one loop ever runs per scheduler.
    pub fn start(self: &Arc<Self>) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            info!(interval_secs = scheduler.interval.as_secs(), "sync scheduler started");
            loop {
                if let Err(err) = scheduler.run_cycle().await {
                    error!(error = %err, "sync cycle failed");
                }
                tokio::time::sleep(scheduler.interval).await;
            }
        });
        true
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Kick off a sync for one guild without waiting for it. Failures are
    /// logged inside the spawned task.
    pub fn trigger_sync(self: &Arc<Self>, guild_id: &str) {
        let Some(orchestrator) = self.orchestrator.clone() else {
            warn!(guild_id, "sync trigger ignored, no bot token configured");
            return;
        };
        let guild_id = guild_id.to_string();
        tokio::spawn(async move {
            match orchestrator.sync(&guild_id).await {
                Ok(result) => {
                    info!(
                        guild_id,
                        messages_saved = result.messages_saved,
                        "triggered sync finished"
                    );
                },
                Err(err) => warn!(guild_id, error = %err, "triggered sync rejected"),
            }
        });
    }

    /// One full pass: probe credentials, then sync every selected guild and
    /// the DM set. Per-guild failures are logged and do not stop the pass.
    pub async fn run_cycle(&self) -> anyhow::Result<()> {
        let Some(orchestrator) = self.orchestrator.as_ref() else {
            warn!("no bot token configured, skipping sync cycle");
            return Ok(());
        };

        let started = guildsync_common::now_ms();
        // If the bot cannot even list its own guilds, the token is bad and
        // the whole cycle would fail guild by guild. Skip it instead.
        if let Err(err) = orchestrator.discovery().list_bot_guilds().await {
            warn!(error = %err, "bot guild probe failed, skipping sync cycle");
            return Ok(());
        }

        let guild_ids = match self.registry.list_selected_guild_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "could not load selected guilds");
                Vec::new()
            },
        };

        for guild_id in &guild_ids {
            match orchestrator.sync(guild_id).await {
                Ok(result) => debug!(
                    guild_id,
                    messages_saved = result.messages_saved,
                    channel_errors = result.channel_errors.len(),
                    "scheduled guild sync finished"
                ),
                Err(err) => warn!(guild_id, error = %err, "scheduled guild sync rejected"),
            }
        }

        match orchestrator.sync_direct_messages().await {
            Ok(result) => debug!(
                messages_saved = result.messages_saved,
                "scheduled dm sync finished"
            ),
            Err(err) => warn!(error = %err, "scheduled dm sync rejected"),
        }

        info!(
            guilds = guild_ids.len(),
            elapsed_ms = guildsync_common::now_ms().saturating_sub(started),
            "sync cycle finished"
        );
        Ok(())
    }
}
