//! Discord OAuth authorization-code flow.
//!
//! Only the pieces the sync engine needs: build the consent URL, exchange
//! the callback code for a user token, and list the guilds where the user
//! holds the administrator permission.

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::Value,
};

use crate::{
    error::{ApiError, Result},
    types::Guild,
};

/// Administrator bit in the Discord permissions field.
const ADMIN_PERMISSION: u64 = 0x8;

const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
const OAUTH_SCOPES: &str = "identify guilds";

/// OAuth application credentials.
#[derive(Clone)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
}

/// Client for the authorization-code exchange.
pub struct OauthFlow {
    http: reqwest::Client,
    base: String,
    config: OauthConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl OauthFlow {
    pub fn new(config: OauthConfig, api_base: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base: api_base.trim_end_matches('/').to_string(),
            config,
        })
    }

    /// The consent URL the user should be redirected to.
    pub fn authorize_url(&self) -> Result<String> {
        let url = url::Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", OAUTH_SCOPES),
            ],
        )
        .map_err(|err| ApiError::malformed(format!("authorize url: {err}")))?;
        Ok(url.to_string())
    }

    /// Exchange a callback `code` for a user access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.base))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|err| ApiError::malformed(format!("oauth2/token: {err}")))?;
        Ok(token.access_token)
    }

    /// Guilds where the user holds the administrator permission, queried with
    /// the user's own token (Bearer, not Bot).
    pub async fn admin_guilds(&self, access_token: &str) -> Result<Vec<Guild>> {
        let response = self
            .http
            .get(format!("{}/users/@me/guilds", self.base))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        let items: Vec<Value> = serde_json::from_str(&body)
            .map_err(|err| ApiError::malformed(format!("users/@me/guilds: {err}")))?;

        Ok(items
            .into_iter()
            .filter(|item| has_admin_permission(item))
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }
}

/// The permissions field arrives as a decimal string on current API
/// versions, but older payloads used a number; accept both.
fn has_admin_permission(guild: &Value) -> bool {
    let permissions = match guild.get("permissions") {
        Some(Value::String(s)) => s.parse::<u64>().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    };
    permissions & ADMIN_PERMISSION != 0
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn flow(base: &str) -> OauthFlow {
        OauthFlow::new(
            OauthConfig {
                client_id: "app123".into(),
                client_secret: Secret::new("shh".to_string()),
                redirect_uri: "http://localhost:8000/discord/oauth/callback".into(),
            },
            base,
        )
        .unwrap()
    }

    #[test]
    fn authorize_url_carries_client_and_redirect() {
        let url = flow("https://discord.com/api/v10").authorize_url().unwrap();
        assert!(url.starts_with("https://discord.com/oauth2/authorize?"));
        assert!(url.contains("client_id=app123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=identify+guilds"));
    }

    #[tokio::test]
    async fn exchange_posts_the_code_and_parses_the_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .with_status(200)
            .with_body(r#"{"access_token": "user-token", "token_type": "Bearer"}"#)
            .create_async()
            .await;

        let token = flow(&server.url()).exchange_code("abc").await.unwrap();
        assert_eq!(token, "user-token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_exchange_surfaces_the_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/oauth2/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let err = flow(&server.url()).exchange_code("bad").await.unwrap_err();
        assert!(matches!(err, ApiError::Remote { status: 400, .. }));
    }

    #[tokio::test]
    async fn only_admin_guilds_survive_the_filter() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/@me/guilds")
            .match_header("authorization", "Bearer user-token")
            .with_status(200)
            .with_body(
                r#"[{"id": "g1", "name": "mine", "permissions": "2147483656"},
                    {"id": "g2", "name": "member only", "permissions": "104324673"},
                    {"id": "g3", "name": "numeric", "permissions": 8}]"#,
            )
            .create_async()
            .await;

        let guilds = flow(&server.url()).admin_guilds("user-token").await.unwrap();
        let ids: Vec<&str> = guilds.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g3"]);
    }
}
