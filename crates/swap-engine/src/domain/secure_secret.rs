//! # Secure Secret Type
//!
//! Wrapper for swap preimages that zeroizes memory on drop.
//!
//! ## Security
//!
//! The secret is the only thing standing between a locked escrow and its
//! counterparty until the coordinator reveals it. It must not linger in
//! memory or leak through logs:
//!
//! - bytes are zeroed when the value is dropped
//! - `Debug` prints a placeholder
//! - serialization uses hex, never raw bytes

use super::errors::ValidationError;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum secret length in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Default secret length in bytes.
pub const DEFAULT_SECRET_LEN: usize = 32;

/// Maximum secret length in bytes.
pub const MAX_SECRET_LEN: usize = 1_024;

/// Reject secret lengths outside the allowed range.
pub fn check_secret_len(len: usize) -> Result<(), ValidationError> {
    if len < MIN_SECRET_LEN {
        return Err(ValidationError::SecretTooShort {
            got: len,
            min: MIN_SECRET_LEN,
        });
    }
    if len > MAX_SECRET_LEN {
        return Err(ValidationError::SecretTooLong {
            got: len,
            max: MAX_SECRET_LEN,
        });
    }
    Ok(())
}

/// A secure secret that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureSecret {
    inner: Vec<u8>,
}

impl SecureSecret {
    /// Wrap secret bytes, rejecting lengths outside
    /// [`MIN_SECRET_LEN`]..=[`MAX_SECRET_LEN`].
    pub fn new(bytes: Vec<u8>) -> Result<Self, ValidationError> {
        check_secret_len(bytes.len())?;
        Ok(Self { inner: bytes })
    }

    /// Wrap bytes already known to satisfy the minimum length.
    pub(crate) fn new_unchecked(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() >= MIN_SECRET_LEN);
        Self { inner: bytes }
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x")).ok()?;
        Self::new(bytes).ok()
    }

    /// Get the secret bytes.
    ///
    /// # Security
    ///
    /// Avoid keeping references to the returned slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Hex encoding, for wire payloads that carry the revealed secret.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.inner)
    }

    /// Secret length in bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the secret has no bytes.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl PartialEq for SecureSecret {
    fn eq(&self, other: &Self) -> bool {
        self.inner.len() == other.inner.len()
            && self
                .inner
                .iter()
                .zip(other.inner.iter())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl Eq for SecureSecret {}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecureSecret(***)")
    }
}

impl Serialize for SecureSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SecureSecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Self::new(bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_secret_creation() {
        let secret = SecureSecret::new(vec![0xAB; 32]).unwrap();
        assert_eq!(secret.as_bytes()[0], 0xAB);
        assert_eq!(secret.len(), 32);
    }

    #[test]
    fn test_secure_secret_rejects_short() {
        assert_eq!(
            SecureSecret::new(vec![1; 15]),
            Err(ValidationError::SecretTooShort { got: 15, min: 16 })
        );
        assert!(SecureSecret::new(vec![1; 16]).is_ok());
    }

    #[test]
    fn test_secure_secret_rejects_long() {
        assert!(SecureSecret::new(vec![1; MAX_SECRET_LEN]).is_ok());
        assert_eq!(
            SecureSecret::new(vec![1; MAX_SECRET_LEN + 1]),
            Err(ValidationError::SecretTooLong {
                got: MAX_SECRET_LEN + 1,
                max: MAX_SECRET_LEN
            })
        );
    }

    #[test]
    fn test_secure_secret_debug_hides_value() {
        let secret = SecureSecret::new(vec![0xAB; 32]).unwrap();
        let debug_str = format!("{:?}", secret);
        assert!(!debug_str.contains("ab"));
        assert!(!debug_str.contains("AB"));
        assert!(debug_str.contains("***"));
    }

    #[test]
    fn test_secure_secret_hex() {
        let secret = SecureSecret::from_hex(&"cd".repeat(24)).unwrap();
        assert_eq!(secret.len(), 24);
        assert_eq!(secret.to_hex(), "cd".repeat(24));
        assert!(SecureSecret::from_hex("zz").is_none());
    }

    #[test]
    fn test_secure_secret_serde() {
        let secret = SecureSecret::new(vec![0x11; 32]).unwrap();
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, format!("\"{}\"", "11".repeat(32)));
        let back: SecureSecret = serde_json::from_str(&json).unwrap();
        assert_eq!(back, secret);
    }

    #[test]
    fn test_secure_secret_equality() {
        let a = SecureSecret::new(vec![1; 32]).unwrap();
        let b = SecureSecret::new(vec![2; 32]).unwrap();
        let c = SecureSecret::new(vec![1; 20]).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.clone(), a);
    }
}
