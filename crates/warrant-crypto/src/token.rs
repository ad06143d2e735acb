//! Opaque bearer tokens.
//!
//! Tokens carry no structure beyond a kind prefix. They are unguessable
//! because the body is [`TOKEN_ENTROPY_BYTES`] bytes from the OS RNG.

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Random bytes in every minted token (128 bits).
pub const TOKEN_ENTROPY_BYTES: usize = 16;

/// Characters of the token body kept in log-safe fingerprints.
const FINGERPRINT_CHARS: usize = 8;

/// What a token authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A human login session.
    Session,
    /// An agent delegation.
    Agent,
}

impl TokenKind {
    /// Prefix prepended to tokens of this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Session => "sess-",
            Self::Agent => "agent-",
        }
    }
}

/// An opaque bearer token.
///
/// The token string is wiped from memory on drop and never shown by
/// `Debug`. Use [`Self::fingerprint`] when a token must appear in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretToken(String);

impl SecretToken {
    /// Mint a new random token of the given kind.
    #[must_use]
    pub fn generate(kind: TokenKind) -> Self {
        let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = format!("{}{}", kind.prefix(), hex::encode(bytes));
        bytes.zeroize();
        Self(token)
    }

    /// Wrap a token string presented by a caller.
    #[must_use]
    pub fn from_string(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token string. Hand this to the token holder only.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The kind encoded in the prefix, if recognised.
    #[must_use]
    pub fn kind(&self) -> Option<TokenKind> {
        [TokenKind::Session, TokenKind::Agent]
            .into_iter()
            .find(|k| self.0.starts_with(k.prefix()))
    }

    /// A log-safe identifier: the prefix plus the first few body characters.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let prefix = self.kind().map_or("", TokenKind::prefix);
        let body: String = self
            .0
            .get(prefix.len()..)
            .unwrap_or_default()
            .chars()
            .take(FINGERPRINT_CHARS)
            .collect();
        format!("{prefix}{body}…")
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretToken({})", self.fingerprint())
    }
}
