//! HTTP gateway: health, analysis pass-through, transcription, and the
//! Discord sync surface.
//!
//! All domain logic lives in other crates and is reached through the trait
//! objects in [`guildsync_service_traits::Services`]; the gateway only maps
//! routes onto service calls and service errors onto status codes.

pub mod chat;
pub mod oauth;
pub mod server;
pub mod state;
pub mod sync;

pub use {
    chat::ChatMemory,
    oauth::LiveOauthService,
    server::{build_app, start_server},
    state::AppState,
    sync::LiveSyncService,
};
