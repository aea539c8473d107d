//! Discord guild message synchronization engine.
//!
//! Discovers the channels a bot can see inside a guild, pulls a bounded page
//! of message history from each, normalizes the rows, and persists them
//! through the storage gateway, on demand and on a fixed schedule. Partial
//! failures (a denied channel, a malformed payload, a flaky request) are
//! contained at the smallest scope that can absorb them: a bad message never
//! aborts its channel, a bad channel never aborts its guild, and a bad guild
//! never stops the scheduler.

pub mod api;
pub mod discovery;
pub mod error;
pub mod normalize;
pub mod oauth;
pub mod paginate;
pub mod scheduler;
pub mod sync;
pub mod types;

pub use {
    api::{ApiClient, ListOutcome},
    discovery::ChannelDiscovery,
    error::ApiError,
    normalize::normalize,
    oauth::{OauthConfig, OauthFlow},
    paginate::{MAX_PAGE_LIMIT, MessagePaginator},
    scheduler::SyncScheduler,
    sync::{SyncError, SyncLimits, SyncOrchestrator},
    types::{Channel, ChannelKind, ChannelList, Guild, SyncResult},
};
