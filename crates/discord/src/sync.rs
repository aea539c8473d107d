//! Sync orchestration: one guild (or the DM set) per run.
//!
//! Failure containment is the point. A message that fails to persist is
//! counted and skipped; a channel that fails to fetch is recorded and
//! skipped; a discovery failure ends the run with an empty result carrying
//! the reason. The only hard error a run returns is a concurrency rejection.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use {
    guildsync_storage::{MessageSource, MessageStore},
    serde_json::Value,
    tracing::{info, warn},
};

use crate::{
    api::ApiClient,
    discovery::ChannelDiscovery,
    error::Result as ApiResult,
    normalize::normalize,
    paginate::MessagePaginator,
    types::{Channel, ChannelFailure, ChannelList, SyncResult},
};

/// Scope key used for the DM run in the in-flight set. `@` cannot appear in
/// a Discord snowflake, so this never collides with a guild id.
const DM_SCOPE: &str = "@dm";

/// Page sizes for guild and DM history fetches.
#[derive(Debug, Clone, Copy)]
pub struct SyncLimits {
    pub guild_page: u8,
    pub dm_page: u8,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            guild_page: 100,
            dm_page: 50,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A run for this scope is already in flight; the caller should treat
    /// the in-flight run as its result.
    #[error("sync already running for {scope}")]
    AlreadyRunning { scope: String },
}

/// Runs full sync passes, one guild at a time.
pub struct SyncOrchestrator {
    discovery: ChannelDiscovery,
    paginator: MessagePaginator,
    store: Arc<dyn MessageStore>,
    limits: SyncLimits,
    in_flight: Mutex<HashSet<String>>,
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, store: Arc<dyn MessageStore>, limits: SyncLimits) -> Self {
        Self {
            discovery: ChannelDiscovery::new(Arc::clone(&api)),
            paginator: MessagePaginator::new(api),
            store,
            limits,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn discovery(&self) -> &ChannelDiscovery {
        &self.discovery
    }

    /// Sync one guild: discover channels, fetch a page of history from each
    /// fetchable one, persist the rows.
    pub async fn sync(&self, guild_id: &str) -> Result<SyncResult, SyncError> {
        let _guard = self.acquire(guild_id)?;
        let started = guildsync_common::now_ms();
        let mut result = SyncResult::new(MessageSource::Discord, Some(guild_id));

        let channels = match self.discovery.list_channels(guild_id).await {
            Ok(ChannelList::Listed(channels)) => channels,
            Ok(ChannelList::Denied(reason)) => {
                warn!(guild_id, reason, "channel discovery denied");
                result.discovery_error = Some(reason);
                return Ok(result);
            },
            Ok(ChannelList::Malformed(body)) => {
                warn!(guild_id, body = %body, "channel discovery returned unexpected shape");
                result.discovery_error = Some(format!("unexpected response shape: {body}"));
                return Ok(result);
            },
            Err(err) => {
                warn!(guild_id, error = %err, "channel discovery failed");
                result.discovery_error = Some(err.to_string());
                return Ok(result);
            },
        };

        let fetchable: Vec<Channel> = channels
            .into_iter()
            .filter(|channel| channel.kind.is_fetchable())
            .collect();
        result.channels_scanned = fetchable.len();

        for channel in &fetchable {
            self.sync_channel(
                channel,
                Some(guild_id),
                MessageSource::Discord,
                self.limits.guild_page,
                &mut result,
            )
            .await;
        }

        info!(
            guild_id,
            channels_scanned = result.channels_scanned,
            messages_saved = result.messages_saved,
            channel_errors = result.channel_errors.len(),
            elapsed_ms = guildsync_common::now_ms().saturating_sub(started),
            "guild sync finished"
        );
        Ok(result)
    }

    /// Sync the bot's direct-message channels. No kind filter here: DM
    /// channel types fall outside the guild taxonomy.
    pub async fn sync_direct_messages(&self) -> Result<SyncResult, SyncError> {
        let _guard = self.acquire(DM_SCOPE)?;
        let started = guildsync_common::now_ms();
        let mut result = SyncResult::new(MessageSource::Dm, None);

        let channels = match self.discovery.list_dm_channels().await {
            Ok(ChannelList::Listed(channels)) => channels,
            Ok(ChannelList::Denied(reason)) => {
                warn!(reason, "dm channel discovery denied");
                result.discovery_error = Some(reason);
                return Ok(result);
            },
            Ok(ChannelList::Malformed(body)) => {
                warn!(body = %body, "dm channel discovery returned unexpected shape");
                result.discovery_error = Some(format!("unexpected response shape: {body}"));
                return Ok(result);
            },
            Err(err) => {
                warn!(error = %err, "dm channel discovery failed");
                result.discovery_error = Some(err.to_string());
                return Ok(result);
            },
        };

        result.channels_scanned = channels.len();
        for channel in &channels {
            self.sync_channel(channel, None, MessageSource::Dm, self.limits.dm_page, &mut result)
                .await;
        }

        info!(
            channels_scanned = result.channels_scanned,
            messages_saved = result.messages_saved,
            channel_errors = result.channel_errors.len(),
            elapsed_ms = guildsync_common::now_ms().saturating_sub(started),
            "dm sync finished"
        );
        Ok(result)
    }

    async fn sync_channel(
        &self,
        channel: &Channel,
        guild_id: Option<&str>,
        source: MessageSource,
        page_limit: u8,
        result: &mut SyncResult,
    ) {
        let page: ApiResult<Vec<Value>> =
            self.paginator.fetch_page(&channel.id, page_limit, None).await;
        let messages = match page {
            Ok(messages) => messages,
            Err(err) => {
                warn!(channel_id = %channel.id, error = %err, "channel fetch failed");
                result.channel_errors.push(ChannelFailure {
                    channel_id: channel.id.clone(),
                    error: err.to_string(),
                });
                return;
            },
        };

        for raw in &messages {
            let row = normalize(raw, channel, guild_id, source);
            match self.store.upsert(row).await {
                Ok(()) => result.messages_saved += 1,
                Err(err) => {
                    warn!(channel_id = %channel.id, error = %err, "failed to persist message");
                    result.persist_failures += 1;
                },
            }
        }
    }

    fn acquire(&self, scope: &str) -> Result<InFlightGuard<'_>, SyncError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(scope.to_string()) {
            return Err(SyncError::AlreadyRunning {
                scope: scope.to_string(),
            });
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            scope: scope.to_string(),
        })
    }
}

/// Releases the scope on drop, including on early returns.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    scope: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.set.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.scope);
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        guildsync_storage::{MemoryMessageStore, MessageStore, PersistedMessage},
        secrecy::Secret,
        std::{
            sync::atomic::{AtomicUsize, Ordering},
            time::Duration,
        },
    };

    fn orchestrator(base: &str, store: Arc<MemoryMessageStore>) -> SyncOrchestrator {
        let api = ApiClient::new(
            Secret::new("t".to_string()),
            base,
            Duration::from_secs(5),
        )
        .unwrap();
        SyncOrchestrator::new(Arc::new(api), store, SyncLimits::default())
    }

    fn messages_body(ids: &[&str]) -> String {
        let items: Vec<Value> = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "content": format!("msg {id}"),
                    "author": { "id": "u1", "username": "alice" },
                })
            })
            .collect();
        serde_json::to_string(&items).unwrap()
    }

    #[tokio::test]
    async fn denied_channel_does_not_abort_the_run() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/guilds/g1/channels")
            .with_status(200)
            .with_body(
                r#"[{"id": "c1", "name": "general", "type": 0},
                    {"id": "c2", "name": "category", "type": 4},
                    {"id": "c3", "name": "thread", "type": 11}]"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/channels/c1/messages?limit=100")
            .with_status(200)
            .with_body(messages_body(&["m1", "m2", "m3"]))
            .create_async()
            .await;
        server
            .mock("GET", "/channels/c3/messages?limit=100")
            .with_status(200)
            .with_body(r#"{"message": "Missing Access"}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryMessageStore::new());
        let result = orchestrator(&server.url(), Arc::clone(&store))
            .sync("g1")
            .await
            .unwrap();

        // c2 is a category, never counted; c3 fails but c1 still lands.
        assert_eq!(result.channels_scanned, 2);
        assert_eq!(result.messages_saved, 3);
        assert_eq!(result.channel_errors.len(), 1);
        assert_eq!(result.channel_errors[0].channel_id, "c3");
        assert!(result.discovery_error.is_none());
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn discovery_denial_yields_empty_result_with_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/guilds/g1/channels")
            .with_status(200)
            .with_body(r#"{"message": "Missing Access"}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryMessageStore::new());
        let result = orchestrator(&server.url(), store).sync("g1").await.unwrap();

        assert_eq!(result.channels_scanned, 0);
        assert_eq!(result.messages_saved, 0);
        assert_eq!(result.discovery_error.as_deref(), Some("Missing Access"));
    }

    /// Store whose every second upsert fails.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryMessageStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MessageStore for FlakyStore {
        async fn upsert(&self, message: PersistedMessage) -> guildsync_storage::Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                return Err(guildsync_storage::Error::unavailable("write failed"));
            }
            self.inner.upsert(message).await
        }

        async fn list_by_channel(
            &self,
            channel_id: &str,
            limit: u32,
        ) -> guildsync_storage::Result<Vec<PersistedMessage>> {
            self.inner.list_by_channel(channel_id, limit).await
        }

        async fn count(&self) -> guildsync_storage::Result<u64> {
            self.inner.count().await
        }
    }

    #[tokio::test]
    async fn persist_failures_are_counted_not_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/guilds/g1/channels")
            .with_status(200)
            .with_body(r#"[{"id": "c1", "name": "general", "type": 0}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/channels/c1/messages?limit=100")
            .with_status(200)
            .with_body(messages_body(&["m1", "m2", "m3", "m4"]))
            .create_async()
            .await;

        let store = Arc::new(FlakyStore::default());
        let api = ApiClient::new(
            Secret::new("t".to_string()),
            &server.url(),
            Duration::from_secs(5),
        )
        .unwrap();
        let orchestrator = SyncOrchestrator::new(
            Arc::new(api),
            Arc::clone(&store) as Arc<dyn MessageStore>,
            SyncLimits::default(),
        );
        let result = orchestrator.sync("g1").await.unwrap();

        // Fetched 4, every second write failed: exact counts, no abort.
        assert_eq!(result.channels_scanned, 1);
        assert_eq!(result.messages_saved, 2);
        assert_eq!(result.persist_failures, 2);
        assert!(result.channel_errors.is_empty());
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unexpected_discovery_shape_is_recorded_not_raised() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/guilds/g1/channels")
            .with_status(200)
            .with_body(r#"{"code": 50001}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryMessageStore::new());
        let result = orchestrator(&server.url(), store).sync("g1").await.unwrap();

        assert_eq!(result.channels_scanned, 0);
        assert!(result.discovery_error.is_some());
    }

    #[tokio::test]
    async fn resync_is_idempotent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/guilds/g1/channels")
            .with_status(200)
            .with_body(r#"[{"id": "c1", "name": "general", "type": 0}]"#)
            .expect(2)
            .create_async()
            .await;
        server
            .mock("GET", "/channels/c1/messages?limit=100")
            .with_status(200)
            .with_body(messages_body(&["m1", "m2"]))
            .expect(2)
            .create_async()
            .await;

        let store = Arc::new(MemoryMessageStore::new());
        let orchestrator = orchestrator(&server.url(), Arc::clone(&store));

        orchestrator.sync("g1").await.unwrap();
        let second = orchestrator.sync("g1").await.unwrap();

        assert_eq!(second.messages_saved, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_runs_for_one_guild_are_rejected() {
        let server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryMessageStore::new());
        let orchestrator = orchestrator(&server.url(), store);

        let _guard = orchestrator.acquire("g1").unwrap();
        let err = orchestrator.sync("g1").await.unwrap_err();
        assert!(matches!(err, SyncError::AlreadyRunning { scope } if scope == "g1"));
    }

    #[tokio::test]
    async fn scope_is_released_after_a_run() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/guilds/g1/channels")
            .with_status(200)
            .with_body("[]")
            .expect(2)
            .create_async()
            .await;

        let store = Arc::new(MemoryMessageStore::new());
        let orchestrator = orchestrator(&server.url(), store);
        orchestrator.sync("g1").await.unwrap();
        orchestrator.sync("g1").await.unwrap();
    }

    #[tokio::test]
    async fn different_guilds_do_not_block_each_other() {
        let server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryMessageStore::new());
        let orchestrator = orchestrator(&server.url(), store);

        let _g1 = orchestrator.acquire("g1").unwrap();
        assert!(orchestrator.acquire("g2").is_ok());
    }

    #[tokio::test]
    async fn dm_sync_skips_type_filter_and_uses_dm_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/@me/channels")
            .with_status(200)
            .with_body(r#"[{"id": "d1", "type": 1}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/channels/d1/messages?limit=50")
            .with_status(200)
            .with_body(messages_body(&["m1"]))
            .create_async()
            .await;

        let store = Arc::new(MemoryMessageStore::new());
        let result = orchestrator(&server.url(), Arc::clone(&store))
            .sync_direct_messages()
            .await
            .unwrap();

        assert_eq!(result.source, MessageSource::Dm);
        assert!(result.guild_id.is_none());
        assert_eq!(result.channels_scanned, 1);
        assert_eq!(result.messages_saved, 1);

        let rows = store.list_by_channel("d1", 10).await.unwrap();
        assert_eq!(rows[0].source, MessageSource::Dm);
        assert!(rows[0].guild_id.is_none());
    }
}
