//! Core error types.

use thiserror::Error;

/// Errors raised when parsing permission-model values at a serialization
/// boundary (config files, wire strings).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The access tier name is not one of `free`, `supervised`, `forbidden`.
    #[error("unknown access tier: {0}")]
    UnknownTier(String),

    /// The action name is not a known resource action.
    #[error("unknown resource action: {0}")]
    UnknownAction(String),

    /// The role name has no preset.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Result type for core parsing operations.
pub type CoreResult<T> = Result<T, CoreError>;
