//! Warrant Crypto - Cryptographic primitives for the delegated-auth kernel.
//!
//! This crate provides:
//! - Opaque bearer tokens minted from the OS RNG (128 bits of entropy)
//! - SHA-256 password digests with constant-time verification
//! - BLAKE3 content hashing for the audit chain
//!
//! # Security Philosophy
//!
//! Secrets are compared in constant time and never printed: tokens and
//! digests redact themselves in `Debug` output.
//!
//! # Example
//!
//! ```
//! use warrant_crypto::{ContentHash, PasswordHash, SecretToken, TokenKind};
//!
//! // Mint a session token
//! let token = SecretToken::generate(TokenKind::Session);
//! assert!(token.as_str().starts_with("sess-"));
//!
//! // Verify a password against a stored digest
//! let digest = PasswordHash::digest("correct horse");
//! assert!(digest.verify("correct horse"));
//! assert!(!digest.verify("battery staple"));
//!
//! // Hash content
//! let hash = ContentHash::hash(b"audit entry");
//! println!("Hash: {}", hash.to_hex());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod hash;
mod password;
mod token;

pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use password::PasswordHash;
pub use token::{SecretToken, TOKEN_ENTROPY_BYTES, TokenKind};
