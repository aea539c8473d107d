use std::{sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    guildsync_config::GuildsyncConfig,
    guildsync_discord::{ApiClient, OauthConfig, OauthFlow, SyncLimits, SyncOrchestrator, SyncScheduler},
    guildsync_gateway::{AppState, LiveOauthService, LiveSyncService, start_server},
    guildsync_service_traits::Services,
    guildsync_storage::{MemoryEventStore, MemoryMessageStore, MemorySelectedGuildRegistry},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "guildsync", about = "Guildsync — Discord guild message sync service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Explicit config file path (skips the standard search locations).
    #[arg(long, global = true, env = "GUILDSYNC_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and the periodic sync loop (default).
    Serve,
    /// Run one guild sync and print the summary.
    Sync {
        /// Guild id to sync.
        guild_id: String,
    },
    /// Run one direct-message sync and print the summary.
    SyncDms,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_ids(false))
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<GuildsyncConfig> {
    let mut cfg = match &cli.config {
        Some(path) => {
            let mut cfg = guildsync_config::load_config(path)?;
            guildsync_config::apply_env_overrides(&mut cfg);
            cfg
        },
        None => guildsync_config::discover_and_load(),
    };
    if let Some(bind) = &cli.bind {
        cfg.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }
    Ok(cfg)
}

/// Engine pieces assembled from config. `orchestrator` is absent when no bot
/// token is configured; the server still starts and serves everything that
/// does not need Discord.
struct Engine {
    orchestrator: Option<Arc<SyncOrchestrator>>,
    scheduler: Arc<SyncScheduler>,
    messages: Arc<MemoryMessageStore>,
    registry: Arc<MemorySelectedGuildRegistry>,
}

fn build_engine(cfg: &GuildsyncConfig) -> anyhow::Result<Engine> {
    let messages = Arc::new(MemoryMessageStore::new());
    let registry = Arc::new(MemorySelectedGuildRegistry::new());

    let orchestrator = match &cfg.discord.bot_token {
        Some(token) => {
            let api = ApiClient::new(
                token.clone(),
                &cfg.discord.api_base,
                Duration::from_secs(cfg.sync.request_timeout_secs),
            )?;
            Some(Arc::new(SyncOrchestrator::new(
                Arc::new(api),
                messages.clone(),
                SyncLimits {
                    guild_page: cfg.sync.guild_page_limit,
                    dm_page: cfg.sync.dm_page_limit,
                },
            )))
        },
        None => {
            warn!("no bot token configured, discord sync is disabled");
            None
        },
    };

    let scheduler = SyncScheduler::new(
        orchestrator.clone(),
        registry.clone(),
        Duration::from_secs(cfg.sync.poll_interval_secs),
    );

    Ok(Engine {
        orchestrator,
        scheduler,
        messages,
        registry,
    })
}

fn build_oauth(
    cfg: &GuildsyncConfig,
    registry: Arc<MemorySelectedGuildRegistry>,
) -> anyhow::Result<Option<LiveOauthService>> {
    let (Some(client_id), Some(client_secret), Some(redirect_uri)) = (
        &cfg.discord.client_id,
        &cfg.discord.client_secret,
        &cfg.discord.redirect_uri,
    ) else {
        return Ok(None);
    };

    let flow = OauthFlow::new(
        OauthConfig {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            redirect_uri: redirect_uri.clone(),
        },
        &cfg.discord.api_base,
    )?;
    Ok(Some(LiveOauthService::new(flow, registry)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let cfg = load_config(&cli)?;
    let engine = build_engine(&cfg)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let mut services = Services::default();
            if let Some(orchestrator) = &engine.orchestrator {
                services.sync = Arc::new(LiveSyncService::new(
                    Arc::clone(orchestrator),
                    Arc::clone(&engine.scheduler),
                ));
            }
            if let Some(oauth) = build_oauth(&cfg, Arc::clone(&engine.registry))? {
                services.oauth = Arc::new(oauth);
            }

            engine.scheduler.start();
            let state = AppState::new(
                Arc::new(services),
                engine.messages,
                Arc::new(MemoryEventStore::new()),
            );

            let bind = format!("{}:{}", cfg.server.bind, cfg.server.port);
            info!(bind, "starting guildsync");
            start_server(&bind, state).await?;
        },
        Commands::Sync { guild_id } => {
            let orchestrator = engine
                .orchestrator
                .ok_or_else(|| anyhow::anyhow!("no bot token configured"))?;
            let result = orchestrator
                .sync(&guild_id)
                .await
                .map_err(|err| anyhow::anyhow!(err))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        },
        Commands::SyncDms => {
            let orchestrator = engine
                .orchestrator
                .ok_or_else(|| anyhow::anyhow!("no bot token configured"))?;
            let result = orchestrator
                .sync_direct_messages()
                .await
                .map_err(|err| anyhow::anyhow!(err))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        },
    }

    Ok(())
}
