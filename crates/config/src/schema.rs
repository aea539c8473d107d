//! Config schema types (server, discord, sync).

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildsyncConfig {
    pub server: ServerConfig,
    pub discord: DiscordConfig,
    pub sync: SyncConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

/// Discord API credentials and endpoint configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token from the Discord developer portal. Every guild/channel read
    /// requires it; the scheduler skips cycles while it is absent.
    #[serde(serialize_with = "serialize_opt_secret")]
    pub bot_token: Option<Secret<String>>,

    /// REST API base URL. Overridable for tests.
    pub api_base: String,

    /// OAuth application client ID (used by the external OAuth flow).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth application client secret.
    #[serde(serialize_with = "serialize_opt_secret")]
    pub client_secret: Option<Secret<String>>,

    /// OAuth redirect URI registered with the application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: "https://discord.com/api/v10".into(),
            client_id: None,
            client_secret: None,
            redirect_uri: None,
        }
    }
}

fn serialize_opt_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Message sync engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between scheduler wake-ups.
    pub poll_interval_secs: u64,
    /// Page size for guild channel message fetches (API max 100).
    pub guild_page_limit: u8,
    /// Page size for direct-message fetches.
    pub dm_page_limit: u8,
    /// Per-request timeout for outbound Discord calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            guild_page_limit: 100,
            dm_page_limit: 50,
            request_timeout_secs: 30,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = GuildsyncConfig::default();
        assert_eq!(cfg.sync.poll_interval_secs, 300);
        assert_eq!(cfg.sync.guild_page_limit, 100);
        assert_eq!(cfg.sync.dm_page_limit, 50);
        assert_eq!(cfg.discord.api_base, "https://discord.com/api/v10");
        assert!(cfg.discord.bot_token.is_none());
    }

    #[test]
    fn debug_redacts_bot_token() {
        let cfg = DiscordConfig {
            bot_token: Some(Secret::new("very-secret".into())),
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: GuildsyncConfig = toml::from_str(
            r#"
            [discord]
            bot_token = "abc"

            [sync]
            poll_interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sync.poll_interval_secs, 60);
        assert_eq!(cfg.sync.guild_page_limit, 100);
        assert!(cfg.discord.bot_token.is_some());
    }
}
