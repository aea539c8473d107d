//! Single-page message history fetches.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    api::{ApiClient, ListOutcome},
    error::{ApiError, Result},
};

/// Hard upper bound Discord accepts for the `limit` query parameter.
pub const MAX_PAGE_LIMIT: u8 = 100;

/// Fetches bounded pages of message history for a channel.
pub struct MessagePaginator {
    api: Arc<ApiClient>,
}

impl MessagePaginator {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Fetch one page of messages, newest first. `limit` is clamped into
    /// `1..=MAX_PAGE_LIMIT`; `before` is the message id cursor for walking
    /// further back in history.
    pub async fn fetch_page(
        &self,
        channel_id: &str,
        limit: u8,
        before: Option<&str>,
    ) -> Result<Vec<Value>> {
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);
        let mut path = format!("channels/{channel_id}/messages?limit={limit}");
        if let Some(cursor) = before {
            path.push_str(&format!("&before={cursor}"));
        }

        match self.api.get_list(&path).await? {
            ListOutcome::Items(items) => Ok(items),
            ListOutcome::Denied(reason) => Err(ApiError::AccessDenied { reason }),
            ListOutcome::Malformed(body) => Err(ApiError::malformed(format!(
                "channels/{channel_id}/messages: {body}"
            ))),
        }
    }
}
