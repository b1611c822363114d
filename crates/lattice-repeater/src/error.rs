//! Error types for the repeater.

/// Result type alias for repeater operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a host-supplied filter or format handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in the repeater.
///
/// Row-level problems (validation failures, unknown row ids) are never
/// errors; they are reported as booleans by the row collection. Only host
/// handler rejections and construction mistakes surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The host filter rejected a search.
    #[error("Filter rejected search for '{key}': {source}")]
    Filter {
        key: String,
        #[source]
        source: HandlerError,
    },

    /// The host format handler rejected a merged value.
    #[error("Format handler rejected merged value: {0}")]
    Format(#[source] HandlerError),

    /// A repeater was built without a change handler.
    #[error("A change handler is required to build a repeater")]
    MissingChangeHandler,

    /// The row schema is malformed.
    #[error("Invalid row schema at column {column}: {message}")]
    InvalidSchema { column: usize, message: String },

    /// A status string did not name a known row status.
    #[error("Unknown row status '{0}'")]
    UnknownStatus(String),

    /// The row schema could not be parsed.
    #[error("Failed to parse row schema: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a filter rejection error.
    pub fn filter(key: impl Into<String>, source: HandlerError) -> Self {
        Self::Filter {
            key: key.into(),
            source,
        }
    }

    /// Create a schema error.
    pub fn invalid_schema(column: usize, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            column,
            message: message.into(),
        }
    }
}
