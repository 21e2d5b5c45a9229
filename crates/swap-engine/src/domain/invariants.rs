//! # Domain Invariants
//!
//! Business rules checked by the coordinator before it touches a ledger.

use super::errors::{Hash, InvariantViolation};
use super::timelocks::{TimelockSchedule, TimelockStage, Timelocks};
use sha2::{Digest, Sha256};

/// Default safety margin between destination withdrawal close and source
/// cancellation open (10 minutes).
pub const MIN_WINDOW_MARGIN_SECS: u64 = 600;

/// Invariant: SHA-256(secret) equals the hashlock.
///
/// Digests are compared without early exit.
pub fn invariant_secret_matches(secret: &[u8], hashlock: &Hash) -> Result<(), InvariantViolation> {
    let digest = Sha256::digest(secret);
    let diff = digest
        .iter()
        .zip(hashlock.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    if diff == 0 {
        Ok(())
    } else {
        Err(InvariantViolation::SecretMismatch)
    }
}

/// Invariant: stages strictly increase.
pub fn invariant_timelock_ordering(schedule: &TimelockSchedule) -> Result<(), InvariantViolation> {
    schedule.validate()
}

/// Invariant: the destination withdrawal window closes before the source
/// cancellation window opens, by at least `margin_secs`.
///
/// Otherwise the resolver could cancel the source after the user already
/// withdrew on the destination.
pub fn invariant_cross_escrow_windows(
    source: &Timelocks,
    destination: &Timelocks,
    margin_secs: u64,
) -> Result<(), InvariantViolation> {
    let src_cancellation = source.stage_time(TimelockStage::Cancellation);
    let dst_cancellation = destination.stage_time(TimelockStage::Cancellation);
    if src_cancellation <= dst_cancellation + margin_secs {
        return Err(InvariantViolation::CrossEscrowWindow {
            dst_cancellation,
            src_cancellation,
            margin: margin_secs,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(cancellation: u32) -> TimelockSchedule {
        TimelockSchedule::new(10, 20, cancellation, cancellation + 100).unwrap()
    }

    #[test]
    fn test_secret_matches() {
        let secret = [0x42u8; 32];
        let hashlock: Hash = Sha256::digest(secret).into();
        assert!(invariant_secret_matches(&secret, &hashlock).is_ok());
        assert_eq!(
            invariant_secret_matches(&[0x43u8; 32], &hashlock),
            Err(InvariantViolation::SecretMismatch)
        );
    }

    #[test]
    fn test_cross_escrow_valid() {
        let src = Timelocks::new(1_000, schedule(7_200));
        let dst = Timelocks::new(1_500, schedule(3_600));
        assert!(invariant_cross_escrow_windows(&src, &dst, 600).is_ok());
    }

    #[test]
    fn test_cross_escrow_margin_violated() {
        let src = Timelocks::new(1_000, schedule(7_200));
        let dst = Timelocks::new(4_000, schedule(3_600));
        assert!(matches!(
            invariant_cross_escrow_windows(&src, &dst, 600),
            Err(InvariantViolation::CrossEscrowWindow {
                dst_cancellation: 7_600,
                src_cancellation: 8_200,
                margin: 600
            })
        ));
    }

    #[test]
    fn test_cross_escrow_exact_margin_is_violation() {
        let src = Timelocks::new(0, schedule(1_000));
        let dst = Timelocks::new(0, schedule(400));
        assert!(invariant_cross_escrow_windows(&src, &dst, 600).is_err());
        assert!(invariant_cross_escrow_windows(&src, &dst, 599).is_ok());
    }
}
