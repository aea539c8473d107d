//! Service trait interfaces for domain services.
//!
//! Each trait has a `Noop` implementation that returns empty/default
//! responses or a "not configured" error, so the gateway can run standalone
//! before domain crates are wired in.

use {async_trait::async_trait, serde_json::Value};

/// Error type returned by service methods.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Message { message: String },
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
}

impl ServiceError {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }
}

impl From<String> for ServiceError {
    fn from(value: String) -> Self {
        Self::message(value)
    }
}

impl From<&str> for ServiceError {
    fn from(value: &str) -> Self {
        Self::message(value)
    }
}

pub type ServiceResult<T = Value> = Result<T, ServiceError>;

// ── Intelligence ────────────────────────────────────────────────────────────

/// Text-analysis backend the gateway forwards analysis routes to.
#[async_trait]
pub trait IntelligenceService: Send + Sync {
    /// Named-entity recognition over free text.
    async fn ner(&self, params: Value) -> ServiceResult;
    /// Label classification for a text against candidate labels.
    async fn classify(&self, params: Value) -> ServiceResult;
    /// Structured field extraction from a document.
    async fn extract(&self, params: Value) -> ServiceResult;
    /// Dense vector embeddings for one or more texts.
    async fn embed(&self, params: Value) -> ServiceResult;
    /// Free-form text generation.
    async fn generate(&self, params: Value) -> ServiceResult;
    /// Conversational completion over prior turns plus a new message.
    async fn chat(&self, params: Value) -> ServiceResult;
}

pub struct NoopIntelligenceService;

#[async_trait]
impl IntelligenceService for NoopIntelligenceService {
    async fn ner(&self, _params: Value) -> ServiceResult {
        Err("intelligence service not configured".into())
    }

    async fn classify(&self, _params: Value) -> ServiceResult {
        Err("intelligence service not configured".into())
    }

    async fn extract(&self, _params: Value) -> ServiceResult {
        Err("intelligence service not configured".into())
    }

    async fn embed(&self, _params: Value) -> ServiceResult {
        Err("intelligence service not configured".into())
    }

    async fn generate(&self, _params: Value) -> ServiceResult {
        Err("intelligence service not configured".into())
    }

    async fn chat(&self, _params: Value) -> ServiceResult {
        Err("intelligence service not configured".into())
    }
}

// ── STT (Speech-to-Text) ────────────────────────────────────────────────────

#[async_trait]
pub trait SttService: Send + Sync {
    /// Transcribe audio to text (base64-encoded audio in params).
    async fn transcribe(&self, params: Value) -> ServiceResult;
    /// Transcribe raw audio bytes directly (no base64 encoding needed).
    ///
    /// `format` is a short name like `"webm"`, `"ogg"`, `"mp3"` etc.
    async fn transcribe_bytes(
        &self,
        audio: bytes::Bytes,
        format: &str,
        language: Option<&str>,
    ) -> ServiceResult;
}

pub struct NoopSttService;

#[async_trait]
impl SttService for NoopSttService {
    async fn transcribe(&self, _params: Value) -> ServiceResult {
        Err("STT not available".into())
    }

    async fn transcribe_bytes(
        &self,
        _audio: bytes::Bytes,
        _format: &str,
        _language: Option<&str>,
    ) -> ServiceResult {
        Err("STT not available".into())
    }
}

// ── OAuth ───────────────────────────────────────────────────────────────────

/// Discord OAuth flow: builds the authorize URL and handles the callback
/// exchange, recording which guild the user designates for syncing.
#[async_trait]
pub trait OauthService: Send + Sync {
    /// The URL the user should be redirected to for consent.
    async fn authorize_url(&self) -> ServiceResult;
    /// Exchange the callback `code`, inspect the user's guilds, and record
    /// the designated guild. Returns a summary of what was recorded.
    async fn handle_callback(&self, code: &str) -> ServiceResult;
}

pub struct NoopOauthService;

#[async_trait]
impl OauthService for NoopOauthService {
    async fn authorize_url(&self) -> ServiceResult {
        Err("oauth not configured".into())
    }

    async fn handle_callback(&self, _code: &str) -> ServiceResult {
        Err("oauth not configured".into())
    }
}

// ── Sync ────────────────────────────────────────────────────────────────────

/// Guild message synchronization surface exposed over the gateway.
#[async_trait]
pub trait SyncService: Send + Sync {
    /// Start a guild sync without waiting for it to finish.
    async fn trigger_guild_sync(&self, guild_id: &str) -> ServiceResult;
    /// Run a full guild sync and return its summary.
    async fn sync_guild(&self, guild_id: &str) -> ServiceResult;
    /// Run a full DM sync and return its summary.
    async fn sync_direct_messages(&self) -> ServiceResult;
    /// Whether the bot is connected to the given guild.
    async fn guild_connected(&self, guild_id: &str) -> ServiceResult;
}

pub struct NoopSyncService;

#[async_trait]
impl SyncService for NoopSyncService {
    async fn trigger_guild_sync(&self, _guild_id: &str) -> ServiceResult {
        Err("sync service not configured".into())
    }

    async fn sync_guild(&self, _guild_id: &str) -> ServiceResult {
        Err("sync service not configured".into())
    }

    async fn sync_direct_messages(&self) -> ServiceResult {
        Err("sync service not configured".into())
    }

    async fn guild_connected(&self, _guild_id: &str) -> ServiceResult {
        Ok(serde_json::json!({ "connected": false }))
    }
}

// ── Services bundle ─────────────────────────────────────────────────────────

use std::sync::Arc;

/// Bundle of all domain service trait objects.
///
/// Shared by the gateway and any other transport layer; both sides call
/// service methods directly through this struct.
pub struct Services {
    pub intelligence: Arc<dyn IntelligenceService>,
    pub stt: Arc<dyn SttService>,
    pub oauth: Arc<dyn OauthService>,
    pub sync: Arc<dyn SyncService>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            intelligence: Arc::new(NoopIntelligenceService),
            stt: Arc::new(NoopSttService),
            oauth: Arc::new(NoopOauthService),
            sync: Arc::new(NoopSyncService),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
