/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Keys must be non-empty.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,

    /// Failure reported by a backend outside this crate (a remote server,
    /// a file). Implementations of [`KeyValueStore`](crate::KeyValueStore)
    /// map their transport errors into this variant.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
