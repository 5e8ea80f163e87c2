//! Error types for TTL cache operations.

/// Error type for TTL cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No entry is stored under the key (a cache miss).
    #[error("Key not found in cache: {0}")]
    NotFound(i64),

    /// The cleanup interval was zero.
    #[error("Cleanup interval must be greater than zero")]
    InvalidInterval,

    /// The cache was constructed outside a tokio runtime.
    #[error("No tokio runtime available to run the sweeper")]
    NoRuntime,
}

/// Result type for TTL cache operations.
pub type Result<T> = std::result::Result<T, Error>;
