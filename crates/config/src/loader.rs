use std::path::{Path, PathBuf};

use {secrecy::Secret, tracing::debug, tracing::warn};

use crate::schema::GuildsyncConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["guildsync.toml", "guildsync.json"];

/// Load config from the given path (TOML or JSON, decided by extension).
pub fn load_config(path: &Path) -> anyhow::Result<GuildsyncConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
    } else {
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
    }
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./guildsync.{toml,json}` (project-local)
/// 2. `~/.config/guildsync/guildsync.{toml,json}` (user-global)
///
/// Returns `GuildsyncConfig::default()` (plus env overrides) if no config
/// file is found.
pub fn discover_and_load() -> GuildsyncConfig {
    let mut cfg = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                GuildsyncConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        GuildsyncConfig::default()
    };
    apply_env_overrides(&mut cfg);
    cfg
}

/// Apply environment-variable overrides on top of a loaded config.
///
/// Recognized variables: `DISCORD_BOT_TOKEN`, `DISCORD_CLIENT_ID`,
/// `DISCORD_CLIENT_SECRET`, `DISCORD_REDIRECT_URI`,
/// `GUILDSYNC_POLL_INTERVAL_SECS`, `GUILDSYNC_BIND`, `GUILDSYNC_PORT`.
pub fn apply_env_overrides(cfg: &mut GuildsyncConfig) {
    if let Ok(token) = std::env::var("DISCORD_BOT_TOKEN")
        && !token.is_empty()
    {
        cfg.discord.bot_token = Some(Secret::new(token));
    }
    if let Ok(id) = std::env::var("DISCORD_CLIENT_ID")
        && !id.is_empty()
    {
        cfg.discord.client_id = Some(id);
    }
    if let Ok(secret) = std::env::var("DISCORD_CLIENT_SECRET")
        && !secret.is_empty()
    {
        cfg.discord.client_secret = Some(Secret::new(secret));
    }
    if let Ok(uri) = std::env::var("DISCORD_REDIRECT_URI")
        && !uri.is_empty()
    {
        cfg.discord.redirect_uri = Some(uri);
    }
    if let Ok(secs) = std::env::var("GUILDSYNC_POLL_INTERVAL_SECS")
        && let Ok(secs) = secs.parse()
    {
        cfg.sync.poll_interval_secs = secs;
    }
    if let Ok(bind) = std::env::var("GUILDSYNC_BIND")
        && !bind.is_empty()
    {
        cfg.server.bind = bind;
    }
    if let Ok(port) = std::env::var("GUILDSYNC_PORT")
        && let Ok(port) = port.parse()
    {
        cfg.server.port = port;
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/guildsync/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "guildsync") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/guildsync/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "guildsync").map(|d| d.config_dir().to_path_buf())
}
