//! Live [`OauthService`] backed by the Discord authorization-code flow.

use std::sync::Arc;

use {
    async_trait::async_trait,
    guildsync_discord::OauthFlow,
    guildsync_service_traits::{OauthService, ServiceResult},
    guildsync_storage::{SelectedGuildRecord, SelectedGuildRegistry},
    tracing::info,
};

/// Exchanges callback codes and records which guild the user designated for
/// syncing. The first guild where the user is an administrator wins.
pub struct LiveOauthService {
    flow: OauthFlow,
    registry: Arc<dyn SelectedGuildRegistry>,
}

impl LiveOauthService {
    #[must_use]
    pub fn new(flow: OauthFlow, registry: Arc<dyn SelectedGuildRegistry>) -> Self {
        Self { flow, registry }
    }
}

#[async_trait]
impl OauthService for LiveOauthService {
    async fn authorize_url(&self) -> ServiceResult {
        let url = self.flow.authorize_url().map_err(|err| err.to_string())?;
        Ok(serde_json::json!({ "url": url }))
    }

    async fn handle_callback(&self, code: &str) -> ServiceResult {
        let token = self
            .flow
            .exchange_code(code)
            .await
            .map_err(|err| err.to_string())?;
        let guilds = self
            .flow
            .admin_guilds(&token)
            .await
            .map_err(|err| err.to_string())?;

        let Some(selected) = guilds.first() else {
            return Err("user administers no guilds".into());
        };
        let guild_ids: Vec<String> = guilds.iter().map(|g| g.id.clone()).collect();

        self.registry
            .record_selection(SelectedGuildRecord {
                user_token: token,
                guild_ids_seen: guild_ids.clone(),
                selected_guild: selected.id.clone(),
            })
            .await
            .map_err(|err| err.to_string())?;

        info!(guild_id = %selected.id, "guild selected for sync");
        Ok(serde_json::json!({
            "selected_guild": selected.id,
            "admin_guilds": guild_ids,
        }))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        guildsync_discord::OauthConfig,
        guildsync_storage::MemorySelectedGuildRegistry,
        secrecy::Secret,
    };

    fn service(base: &str, registry: Arc<MemorySelectedGuildRegistry>) -> LiveOauthService {
        let flow = OauthFlow::new(
            OauthConfig {
                client_id: "app123".into(),
                client_secret: Secret::new("shh".to_string()),
                redirect_uri: "http://localhost:8000/discord/oauth/callback".into(),
            },
            base,
        )
        .unwrap();
        LiveOauthService::new(flow, registry)
    }

    #[tokio::test]
    async fn callback_records_the_first_admin_guild() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token": "user-token"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/users/@me/guilds")
            .with_status(200)
            .with_body(
                r#"[{"id": "g1", "name": "mine", "permissions": "8"},
                    {"id": "g2", "name": "other", "permissions": "8"}]"#,
            )
            .create_async()
            .await;

        let registry = Arc::new(MemorySelectedGuildRegistry::new());
        let summary = service(&server.url(), Arc::clone(&registry))
            .handle_callback("abc")
            .await
            .unwrap();

        assert_eq!(summary["selected_guild"], "g1");
        assert_eq!(
            registry.list_selected_guild_ids().await.unwrap(),
            vec!["g1".to_string()]
        );
    }

    #[tokio::test]
    async fn callback_without_admin_guilds_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token": "user-token"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/users/@me/guilds")
            .with_status(200)
            .with_body(r#"[{"id": "g1", "permissions": "0"}]"#)
            .create_async()
            .await;

        let registry = Arc::new(MemorySelectedGuildRegistry::new());
        let err = service(&server.url(), Arc::clone(&registry))
            .handle_callback("abc")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no guilds"));
        assert!(registry.list_selected_guild_ids().await.unwrap().is_empty());
    }
}
