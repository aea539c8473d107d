/// Result type for Discord API calls.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Typed failure modes for a single Discord REST call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network-level failure (timeout, DNS, connection reset).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Discord answered with a non-2xx status.
    #[error("discord returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// Discord reported the bot lacks access to the resource.
    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    /// The body did not match the expected shape for the endpoint.
    #[error("malformed response body: {context}")]
    MalformedBody { context: String },
}

impl ApiError {
    /// Transport failures and server-side errors are worth a bounded retry;
    /// 4xx denials are not; repeating them cannot succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Remote { status, .. } => *status >= 500 || *status == 429,
            Self::AccessDenied { .. } | Self::MalformedBody { .. } => false,
        }
    }

    #[must_use]
    pub fn malformed(context: impl std::fmt::Display) -> Self {
        Self::MalformedBody {
            context: context.to_string(),
        }
    }
}
