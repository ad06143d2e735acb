//! Password digests with constant-time verification.

use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Digest length in bytes (SHA-256).
const DIGEST_LEN: usize = 32;

/// A stored SHA-256 password digest.
///
/// Comparison goes through [`subtle::ConstantTimeEq`] so the time taken does
/// not depend on where a candidate first differs.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PasswordHash([u8; DIGEST_LEN]);

impl PasswordHash {
    /// Digest a plaintext password.
    #[must_use]
    pub fn digest(password: &str) -> Self {
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&Sha256::digest(password.as_bytes()));
        Self(out)
    }

    /// A digest no real password is expected to match.
    ///
    /// Login runs a comparison against this when the account does not
    /// exist, so unknown and known emails cost the same.
    #[must_use]
    pub fn decoy() -> Self {
        Self::digest("warrant:decoy-credential")
    }

    /// Parse a hex-encoded digest (64 hex characters).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHexEncoding`] for non-hex input and
    /// [`CryptoError::InvalidDigestLength`] if it does not decode to 32 bytes.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let mut bytes = hex::decode(s.trim()).map_err(|_| CryptoError::InvalidHexEncoding)?;
        if bytes.len() != DIGEST_LEN {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::InvalidDigestLength {
                expected: DIGEST_LEN,
                actual,
            });
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(digest))
    }

    /// Hex encoding of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check a plaintext candidate in constant time.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        let candidate = Self::digest(candidate);
        self.0[..].ct_eq(&candidate.0[..]).into()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of `demo-password`.
    const DEMO_DIGEST: &str = "41bd876b085d6031cb0e04de35b88d77f83a4ba39f879fee40805ac19e356023";

    #[test]
    fn test_verify() {
        let hash = PasswordHash::digest("demo-password");
        assert!(hash.verify("demo-password"));
        assert!(!hash.verify("demo-passwore"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(PasswordHash::digest("demo-password").to_hex(), DEMO_DIGEST);
        let parsed = PasswordHash::from_hex(DEMO_DIGEST).unwrap();
        assert!(parsed.verify("demo-password"));
    }

    #[test]
    fn test_from_hex_errors() {
        assert!(matches!(
            PasswordHash::from_hex("not hex"),
            Err(CryptoError::InvalidHexEncoding)
        ));
        assert!(matches!(
            PasswordHash::from_hex("abcd"),
            Err(CryptoError::InvalidDigestLength {
                expected: 32,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_decoy_rejects_common_inputs() {
        let decoy = PasswordHash::decoy();
        assert!(!decoy.verify(""));
        assert!(!decoy.verify("demo-password"));
    }

    #[test]
    fn test_debug_redacts() {
        let hash = PasswordHash::digest("secret");
        assert_eq!(format!("{hash:?}"), "PasswordHash(***)");
    }
}
