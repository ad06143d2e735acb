//! BLAKE3 content hashing for the audit chain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key-derivation context for audit-chain links.
const AUDIT_LINK_DOMAIN: &str = "warrant 2025 audit-entry link";

/// A BLAKE3 content hash (32 bytes).
///
/// Each audit entry stores the hash of the entry before it, so any edit to
/// history breaks every later link.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash arbitrary data.
    #[must_use]
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Link hash for an audit entry: binds the entry's canonical bytes to
    /// the hash of its predecessor.
    #[must_use]
    pub fn link(previous: &Self, entry_bytes: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(AUDIT_LINK_DOMAIN);
        hasher.update(&previous.0);
        hasher.update(entry_bytes);
        Self(*hasher.finalize().as_bytes())
    }

    /// The zero hash, predecessor of the genesis entry.
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Whether this is the zero hash.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 64 hex characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or not 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
