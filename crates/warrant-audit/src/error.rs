//! Audit-related error types.

use thiserror::Error;

/// Errors that can occur with audit storage.
///
/// These never escape the `log_*` methods of [`AuditLog`](crate::AuditLog);
/// they surface only from storage backends, queries, and chain verification.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Storage error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<warrant_storage::StorageError> for AuditError {
    fn from(e: warrant_storage::StorageError) -> Self {
        match e {
            warrant_storage::StorageError::Serialization(msg) => Self::SerializationError(msg),
            other => Self::StorageError(other.to_string()),
        }
    }
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
