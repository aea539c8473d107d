//! Thin typed client over the Discord REST API.
//!
//! Every call resolves to a value or an [`ApiError`]; HTTP status codes never
//! surface as panics or untyped strings. Transient failures get a short
//! bounded retry, denials do not.

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::warn,
};

use crate::error::{ApiError, Result};

const MAX_RETRIES: usize = 2;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Authenticated Discord REST client.
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Secret<String>,
}

/// What a list endpoint actually handed back, decided once at the parse
/// boundary. Discord swaps the array for an error object when the bot lacks
/// access, so "it's JSON" is not enough to call the response a success.
#[derive(Debug, Clone)]
pub enum ListOutcome {
    /// A JSON array; non-object entries are dropped.
    Items(Vec<Value>),
    /// An error object carrying a "message" key.
    Denied(String),
    /// Parseable JSON of some other shape entirely.
    Malformed(Value),
}

impl ListOutcome {
    /// Classify a parsed body from an endpoint that should return an array.
    #[must_use]
    pub fn from_value(body: Value) -> Self {
        match body {
            Value::Array(items) => {
                Self::Items(items.into_iter().filter(Value::is_object).collect())
            },
            Value::Object(ref map) if map.contains_key("message") => {
                let reason = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                Self::Denied(reason)
            },
            other => Self::Malformed(other),
        }
    }
}

impl ApiClient {
    /// Build a client against the given API base, e.g.
    /// `https://discord.com/api/v10`.
    pub fn new(token: Secret<String>, api_base: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// GET a JSON body, retrying transient failures with doubling backoff.
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let mut attempt = 0;
        loop {
            match self.get_once(path).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                    attempt += 1;
                    let wait = RETRY_BASE_DELAY * 2u32.pow(attempt as u32 - 1);
                    warn!(path, attempt, error = %err, "discord request failed, retrying");
                    tokio::time::sleep(wait).await;
                },
                Err(err) => return Err(err),
            }
        }
    }

    /// GET an endpoint expected to return an array, classifying the body.
    pub async fn get_list(&self, path: &str) -> Result<ListOutcome> {
        Ok(ListOutcome::from_value(self.get_json(path).await?))
    }

    async fn get_once(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base, path.trim_start_matches('/'));
        let response = self
            .http
            .get(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bot {}", self.token.expose_secret()),
            )
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
        serde_json::from_str(&body)
            .map_err(|err| ApiError::malformed(format!("{path}: {err}")))
    }
}
