//! Configuration loading and validation.
//!
//! Config files: `guildsync.toml` or `guildsync.json`, searched in `./` then
//! `~/.config/guildsync/`. Environment variables override file values so the
//! binary can run from a bare `.env` (the common deployment shape).

pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{DiscordConfig, GuildsyncConfig, ServerConfig, SyncConfig},
};
