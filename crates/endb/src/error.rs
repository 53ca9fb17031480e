//! Store error types.

/// A failure reported by a storage backend.
///
/// Cloneable so the same failure can be returned to the caller and
/// broadcast to event subscribers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{adapter} backend error: {message}")]
pub struct BackendError {
    /// Name of the adapter that failed.
    pub adapter: String,
    /// Human-readable failure description.
    pub message: String,
}

impl BackendError {
    /// Create a backend error for the named adapter.
    pub fn new(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            message: message.into(),
        }
    }
}

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum EndbError {
    /// The store could not be constructed from its options.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backend failed while serving an operation.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Encoding or decoding a value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A path expression could not be parsed.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for store operations.
pub type EndbResult<T> = Result<T, EndbError>;
