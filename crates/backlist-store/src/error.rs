//! Error types for order storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed (connection or query error). The service
    /// treats this as "store unreachable" and degrades to dry-run mode.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization of a stored value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Order not found.
    #[error("order not found: {order_id}")]
    NotFound {
        /// The order id that was looked up.
        order_id: String,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
