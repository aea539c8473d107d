//! Persistence gateway for synced messages, events, and guild selections.
//!
//! The engine only ever talks to the traits in [`store`]; backends plug in
//! behind them. The in-memory implementations in [`memory`] back tests and
//! standalone runs.

pub mod error;
pub mod memory;
pub mod store;

pub use {
    error::{Error, Result},
    memory::{MemoryEventStore, MemoryMessageStore, MemorySelectedGuildRegistry},
    store::{
        EventStore, MessageSource, MessageStore, PersistedMessage, SelectedGuildRecord,
        SelectedGuildRegistry,
    },
};
