//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warrant_crypto::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use warrant_crypto::prelude::*;
//!
//! let token = SecretToken::generate(TokenKind::Agent);
//! assert!(token.as_str().starts_with("agent-"));
//!
//! let hash = ContentHash::hash(token.as_str().as_bytes());
//! assert!(!hash.is_zero());
//! ```

// Errors
pub use crate::{CryptoError, CryptoResult};

// Tokens
pub use crate::{SecretToken, TokenKind};

// Credentials
pub use crate::PasswordHash;

// Hashing
pub use crate::ContentHash;
