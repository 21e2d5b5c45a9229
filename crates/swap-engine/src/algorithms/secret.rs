//! # Secret Generation and Verification
//!
//! Hashlock primitives. The hash is SHA-256 over the raw secret bytes, which
//! both ledger kinds compute natively (EVM precompile `0x02`, NEAR
//! `env::sha256`).

use crate::domain::{
    invariant_secret_matches, Hash, Hashlock, LedgerId, SecureSecret, SwapId,
    ValidationError, DEFAULT_SECRET_LEN,
};
use crate::domain::secure_secret::check_secret_len;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a 32-byte secret from the OS-seeded CSPRNG.
pub fn generate_secret() -> SecureSecret {
    let mut bytes = vec![0u8; DEFAULT_SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    SecureSecret::new_unchecked(bytes)
}

/// Generate a secret of `len` bytes. Rejects lengths outside the allowed
/// range before allocating.
pub fn generate_secret_with_len(len: usize) -> Result<SecureSecret, ValidationError> {
    check_secret_len(len)?;
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    SecureSecret::new(bytes)
}

/// SHA-256 of the secret bytes.
pub fn compute_hashlock(secret: &[u8]) -> Hashlock {
    Sha256::digest(secret).into()
}

/// Check a candidate secret against a hashlock.
pub fn verify(secret: &[u8], hashlock: &Hashlock) -> bool {
    invariant_secret_matches(secret, hashlock).is_ok()
}

/// Order hash shared by both escrows of a swap.
///
/// SHA-256 over the swap id, hashlock, both ledger names and both amounts
/// (big-endian), so two orders never share escrow addresses.
pub fn compute_order_hash(
    id: &SwapId,
    hashlock: &Hashlock,
    source_ledger: LedgerId,
    destination_ledger: LedgerId,
    amount: u128,
    destination_amount: u128,
) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(hashlock);
    hasher.update(source_ledger.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(destination_ledger.as_str().as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(destination_amount.to_be_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret() {
        let s1 = generate_secret();
        let s2 = generate_secret();
        assert_eq!(s1.len(), 32);
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_generate_secret_with_len() {
        assert_eq!(generate_secret_with_len(48).unwrap().len(), 48);
        assert!(matches!(
            generate_secret_with_len(8),
            Err(ValidationError::SecretTooShort { got: 8, .. })
        ));
        assert!(matches!(
            generate_secret_with_len(usize::MAX),
            Err(ValidationError::SecretTooLong { got: usize::MAX, .. })
        ));
    }

    #[test]
    fn test_hashlock_known_vector() {
        // sha256("abc")
        assert_eq!(
            hex::encode(compute_hashlock(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify() {
        let secret = generate_secret();
        let hashlock = compute_hashlock(secret.as_bytes());
        assert!(verify(secret.as_bytes(), &hashlock));
        assert!(!verify(&[0xCD; 32], &hashlock));
    }

    #[test]
    fn test_order_hash_depends_on_id() {
        let hashlock = [1u8; 32];
        let a = compute_order_hash(&SwapId::new(), &hashlock, LedgerId::Ethereum, LedgerId::Near, 1, 2);
        let b = compute_order_hash(&SwapId::new(), &hashlock, LedgerId::Ethereum, LedgerId::Near, 1, 2);
        assert_ne!(a, b);
    }
}
