use std::error::Error as StdError;

/// Crate-wide result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed storage errors shared across store traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record is missing a field the backend requires.
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },

    /// Backend is not configured or ready.
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from a backend driver.
    #[error("storage operation failed: {context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_record(message: impl std::fmt::Display) -> Self {
        Self::InvalidRecord {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn backend(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
