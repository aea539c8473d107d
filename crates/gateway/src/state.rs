use std::sync::Arc;

use {
    guildsync_service_traits::Services,
    guildsync_storage::{EventStore, MessageStore},
};

use crate::chat::ChatMemory;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub messages: Arc<dyn MessageStore>,
    pub events: Arc<dyn EventStore>,
    pub chat: Arc<ChatMemory>,
}

impl AppState {
    #[must_use]
    pub fn new(
        services: Arc<Services>,
        messages: Arc<dyn MessageStore>,
        events: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            services,
            messages,
            events,
            chat: Arc::new(ChatMemory::default()),
        }
    }
}
