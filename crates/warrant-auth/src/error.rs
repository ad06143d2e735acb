//! Authentication and delegation error types.

use thiserror::Error;
use warrant_core::CoreError;
use warrant_crypto::CryptoError;
use warrant_storage::StorageError;

/// Errors raised while authenticating a human.
///
/// Every variant is recoverable by the caller: log in again or
/// re-authenticate. The `Display` text is safe to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    /// Unknown email or wrong password. The two are deliberately
    /// indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The password matched but the account is deactivated.
    #[error("account deactivated")]
    AccountDeactivated {
        /// The deactivated user.
        user_id: String,
    },

    /// The session token is not known.
    #[error("invalid session")]
    InvalidSession,

    /// The session token was known but has expired. It has been evicted.
    #[error("session expired")]
    SessionExpired {
        /// Owner of the expired session.
        user_id: String,
    },

    /// The credential or session store failed.
    #[error("session store error: {0}")]
    Store(String),
}

impl From<StorageError> for AuthenticationError {
    fn from(e: StorageError) -> Self {
        Self::Store(e.to_string())
    }
}

/// Errors raised while creating or validating a delegation.
///
/// A task that receives one of these cannot proceed; retrying with the
/// same principal will not help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegationError {
    /// The delegating human's session has expired.
    #[error("cannot delegate from expired session of {user_id}")]
    ExpiredSession {
        /// The human whose session expired.
        user_id: String,
    },

    /// The delegating human's session is no longer in the session store
    /// (logged out or evicted).
    #[error("session of {user_id} is not active")]
    SessionNotActive {
        /// The human whose session is gone.
        user_id: String,
    },

    /// The parent agent's token is expired or revoked.
    #[error("parent agent {agent_id} cannot delegate: {reason}")]
    InvalidParent {
        /// The parent agent.
        agent_id: String,
        /// Why the parent was refused.
        reason: String,
    },

    /// The delegation token was never issued or has been revoked.
    #[error("unknown delegation token")]
    UnknownToken,

    /// The delegation token has expired. It has been evicted.
    #[error("delegation token of {agent_id} expired")]
    TokenExpired {
        /// The agent whose token expired.
        agent_id: String,
    },

    /// The token store failed.
    #[error("token store error: {0}")]
    Store(String),
}

impl From<StorageError> for DelegationError {
    fn from(e: StorageError) -> Self {
        Self::Store(e.to_string())
    }
}

/// Errors raised while building the auth kernel from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A role, action or tier name does not parse.
    #[error("invalid policy value: {0}")]
    Policy(#[from] CoreError),

    /// A principal's password digest does not parse.
    #[error("invalid password digest for {user_id}: {source}")]
    Credential {
        /// The principal with the bad digest.
        user_id: String,
        /// Why the digest was rejected.
        #[source]
        source: CryptoError,
    },

    /// A backing store could not be opened or read.
    #[error("store error: {0}")]
    Store(String),
}

/// Result type for human authentication.
pub type AuthResult<T> = Result<T, AuthenticationError>;

/// Result type for delegation.
pub type DelegationResult<T> = Result<T, DelegationError>;
