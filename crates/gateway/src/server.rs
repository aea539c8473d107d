//! Route table and HTTP plumbing.

use std::sync::Arc;

use {
    axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    guildsync_service_traits::ServiceResult,
    serde::Deserialize,
    tower_http::cors::{Any, CorsLayer},
    tracing::{info, warn},
};

use crate::state::AppState;

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ner", post(ner_handler))
        .route("/classify", post(classify_handler))
        .route("/extract", post(extract_handler))
        .route("/embed", post(embed_handler))
        .route("/generate", post(generate_handler))
        .route("/chat", post(chat_handler))
        .route("/transcribe", post(transcribe_handler))
        .route("/discord/sync/{guild_id}", post(trigger_sync_handler))
        .route("/discord/guild/{guild_id}/messages", get(guild_messages_handler))
        .route("/discord/dm_messages", get(dm_messages_handler))
        .route(
            "/discord/channel/{channel_id}/messages",
            get(channel_messages_handler),
        )
        .route("/discord/connected/{guild_id}", get(connected_handler))
        .route("/discord/oauth/url", get(oauth_url_handler))
        .route("/discord/oauth/callback", get(oauth_callback_handler))
        .route("/discord/events", post(append_event_handler).get(list_events_handler))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn start_server(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind, "gateway listening");
    axum::serve(listener, build_app(state)).await
}

fn respond(result: ServiceResult) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── Intelligence pass-through ───────────────────────────────────────────────

async fn ner_handler(
    State(state): State<AppState>,
    Json(params): Json<serde_json::Value>,
) -> Response {
    respond(state.services.intelligence.ner(params).await)
}

async fn classify_handler(
    State(state): State<AppState>,
    Json(params): Json<serde_json::Value>,
) -> Response {
    respond(state.services.intelligence.classify(params).await)
}

async fn extract_handler(
    State(state): State<AppState>,
    Json(params): Json<serde_json::Value>,
) -> Response {
    respond(state.services.intelligence.extract(params).await)
}

async fn embed_handler(
    State(state): State<AppState>,
    Json(params): Json<serde_json::Value>,
) -> Response {
    respond(state.services.intelligence.embed(params).await)
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(params): Json<serde_json::Value>,
) -> Response {
    respond(state.services.intelligence.generate(params).await)
}

#[derive(Deserialize)]
struct ChatParams {
    message: String,
}

/// Chat keeps a bounded transcript: the incoming message is recorded, the
/// trailing context window rides along to the model, and the reply (when the
/// backend produces one) is recorded too.
async fn chat_handler(
    State(state): State<AppState>,
    Json(params): Json<ChatParams>,
) -> Response {
    state.chat.push("user", params.message.clone());
    let history = state.chat.context();
    let request = serde_json::json!({
        "message": params.message,
        "history": history,
    });

    let result = state.services.intelligence.chat(request).await;
    if let Ok(ref value) = result {
        let reply = value
            .get("reply")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if !reply.is_empty() {
            state.chat.push("assistant", reply.to_string());
        }
        if let Err(err) = state
            .events
            .append(serde_json::json!({
                "type": "chat",
                "message": params.message,
                "reply": reply,
            }))
            .await
        {
            warn!(error = %err, "failed to record chat event");
        }
    }
    respond(result)
}

// ── Transcription ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TranscribeQuery {
    format: Option<String>,
    language: Option<String>,
}

async fn transcribe_handler(
    State(state): State<AppState>,
    Query(query): Query<TranscribeQuery>,
    body: bytes::Bytes,
) -> Response {
    let format = query.format.as_deref().unwrap_or("webm");
    respond(
        state
            .services
            .stt
            .transcribe_bytes(body, format, query.language.as_deref())
            .await,
    )
}

// ── Discord sync surface ────────────────────────────────────────────────────

async fn trigger_sync_handler(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Response {
    match state.services.sync.trigger_guild_sync(&guild_id).await {
        Ok(value) => (StatusCode::ACCEPTED, Json(value)).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn guild_messages_handler(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Response {
    respond(state.services.sync.sync_guild(&guild_id).await)
}

async fn dm_messages_handler(State(state): State<AppState>) -> Response {
    respond(state.services.sync.sync_direct_messages().await)
}

#[derive(Deserialize)]
struct MessagesQuery {
    limit: Option<u32>,
}

async fn channel_messages_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(100);
    match state.messages.list_by_channel(&channel_id, limit).await {
        Ok(rows) => Json(serde_json::json!({ "channel_id": channel_id, "messages": rows }))
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn connected_handler(
    State(state): State<AppState>,
    Path(guild_id): Path<String>,
) -> Response {
    respond(state.services.sync.guild_connected(&guild_id).await)
}

// ── OAuth ───────────────────────────────────────────────────────────────────

async fn oauth_url_handler(State(state): State<AppState>) -> Response {
    respond(state.services.oauth.authorize_url().await)
}

#[derive(Deserialize)]
struct OauthCallbackQuery {
    code: String,
}

async fn oauth_callback_handler(
    State(state): State<AppState>,
    Query(query): Query<OauthCallbackQuery>,
) -> Response {
    respond(state.services.oauth.handle_callback(&query.code).await)
}

// ── Events ──────────────────────────────────────────────────────────────────

async fn append_event_handler(
    State(state): State<AppState>,
    Json(event): Json<serde_json::Value>,
) -> Response {
    match state.events.append(event).await {
        Ok(()) => Json(serde_json::json!({ "ok": true })).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct EventsQuery {
    limit: Option<u32>,
}

async fn list_events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Response {
    match state.events.list(query.limit.unwrap_or(50)).await {
        Ok(events) => Json(serde_json::json!({ "events": events })).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::sync::LiveSyncService,
        guildsync_discord::{ApiClient, SyncLimits, SyncOrchestrator, SyncScheduler},
        guildsync_service_traits::Services,
        guildsync_storage::{
            MemoryEventStore, MemoryMessageStore, MemorySelectedGuildRegistry, MessageSource,
            MessageStore, PersistedMessage,
        },
        secrecy::Secret,
        std::time::Duration,
    };

    fn noop_state() -> AppState {
        AppState::new(
            Arc::new(Services::default()),
            Arc::new(MemoryMessageStore::new()),
            Arc::new(MemoryEventStore::new()),
        )
    }

    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_app(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let base = serve(noop_state()).await;
        let response = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn unconfigured_intelligence_maps_to_500() {
        let base = serve(noop_state()).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/ner"))
            .json(&serde_json::json!({ "text": "hello" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn events_round_trip_most_recent_first_window() {
        let base = serve(noop_state()).await;
        let client = reqwest::Client::new();
        for i in 0..3 {
            let response = client
                .post(format!("{base}/discord/events"))
                .json(&serde_json::json!({ "n": i }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
        }

        let body: serde_json::Value = client
            .get(format!("{base}/discord/events?limit=2"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let events = body["events"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["n"], 1);
    }

    #[tokio::test]
    async fn channel_messages_come_from_the_store() {
        let messages = Arc::new(MemoryMessageStore::new());
        messages
            .upsert(PersistedMessage {
                source: MessageSource::Discord,
                guild_id: Some("g1".into()),
                channel_id: "c1".into(),
                channel_name: Some("general".into()),
                author_id: Some("u1".into()),
                author_username: Some("alice".into()),
                message_id: "m1".into(),
                content: Some("hello".into()),
                raw: serde_json::json!({ "id": "m1" }),
            })
            .await
            .unwrap();

        let state = AppState::new(
            Arc::new(Services::default()),
            messages,
            Arc::new(MemoryEventStore::new()),
        );
        let base = serve(state).await;

        let body: serde_json::Value = reqwest::get(format!("{base}/discord/channel/c1/messages"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["messages"][0]["message_id"], "m1");
    }

    #[tokio::test]
    async fn transcribe_without_backend_is_an_error() {
        let base = serve(noop_state()).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/transcribe?format=ogg"))
            .body(vec![0u8; 16])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
    }

    #[tokio::test]
    async fn blocking_guild_sync_returns_the_summary() {
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
            .with_body(r#"[{"id": "m1", "content": "hi", "author": {"id": "u1", "username": "a"}}]"#)
            .create_async()
            .await;

        let api = Arc::new(
            ApiClient::new(
                Secret::new("t".to_string()),
                &server.url(),
                Duration::from_secs(5),
            )
            .unwrap(),
        );
        let messages = Arc::new(MemoryMessageStore::new());
        let orchestrator = Arc::new(SyncOrchestrator::new(
            api,
            messages.clone(),
            SyncLimits::default(),
        ));
        let scheduler = SyncScheduler::new(
            Some(Arc::clone(&orchestrator)),
            Arc::new(MemorySelectedGuildRegistry::new()),
            Duration::from_secs(300),
        );
        let services = Services {
            sync: Arc::new(LiveSyncService::new(orchestrator, scheduler)),
            ..Services::default()
        };
        let state = AppState::new(
            Arc::new(services),
            messages.clone(),
            Arc::new(MemoryEventStore::new()),
        );
        let base = serve(state).await;

        let body: serde_json::Value =
            reqwest::get(format!("{base}/discord/guild/g1/messages"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(body["messages_saved"], 1);
        assert_eq!(messages.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn trigger_sync_acknowledges_immediately() {
        let server = mockito::Server::new_async().await;
        let api = Arc::new(
            ApiClient::new(
                Secret::new("t".to_string()),
                &server.url(),
                Duration::from_secs(5),
            )
            .unwrap(),
        );
        let orchestrator = Arc::new(SyncOrchestrator::new(
            api,
            Arc::new(MemoryMessageStore::new()),
            SyncLimits::default(),
        ));
        let scheduler = SyncScheduler::new(
            Some(Arc::clone(&orchestrator)),
            Arc::new(MemorySelectedGuildRegistry::new()),
            Duration::from_secs(300),
        );
        let services = Services {
            sync: Arc::new(LiveSyncService::new(orchestrator, scheduler)),
            ..Services::default()
        };
        let state = AppState::new(
            Arc::new(services),
            Arc::new(MemoryMessageStore::new()),
            Arc::new(MemoryEventStore::new()),
        );
        let base = serve(state).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/discord/sync/g1"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 202);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "accepted");
    }

    #[tokio::test]
    async fn chat_records_turns_even_without_a_backend() {
        let state = noop_state();
        let chat = Arc::clone(&state.chat);
        let base = serve(state).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&serde_json::json!({ "message": "hello" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(chat.len(), 1);
    }
}
