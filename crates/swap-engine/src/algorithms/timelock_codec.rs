//! # Timelock Codecs
//!
//! Per-ledger wire encodings of an anchored timelock schedule.
//!
//! ## EVM layout (one `uint256`)
//!
//! ```text
//! bits  255..224   223..128   127..96   95..64        63..32        31..0
//!       deployedAt  (zero)     rescue    cancellation  publicWithdr  privateWithdr
//! ```
//!
//! ## NEAR layout
//!
//! A JSON record with the deployment time in nanoseconds (block timestamp
//! resolution) and each stage as a delay in seconds.

use crate::domain::{
    InvariantViolation, LedgerKind, TimelockSchedule, TimelockStage, Timelocks,
};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Width of one stage slot.
pub const STAGE_BITS: usize = 32;

/// Bit offset of `deployed_at`.
pub const DEPLOYED_AT_OFFSET: usize = 224;

/// Nanoseconds per second (NEAR block timestamps).
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// NEAR escrow timelocks as stored by the escrow contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearTimelocks {
    /// Deployment time in nanoseconds.
    pub deployed_at: u64,
    /// Seconds until maker/taker withdrawal opens.
    pub withdrawal_delay: u64,
    /// Seconds until public withdrawal opens.
    pub public_withdrawal_delay: u64,
    /// Seconds until cancellation opens.
    pub cancellation_delay: u64,
    /// Seconds until rescue opens.
    pub rescue_delay: u64,
}

/// Ledger-specific encoded timelocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackedTimelocks {
    /// Packed EVM word.
    Evm(U256),
    /// NEAR record.
    Near(NearTimelocks),
}

impl PackedTimelocks {
    /// Decode back to the semantic form.
    pub fn unpack(&self) -> Result<Timelocks, InvariantViolation> {
        match self {
            PackedTimelocks::Evm(word) => unpack_evm_timelocks(*word),
            PackedTimelocks::Near(record) => unpack_near_timelocks(record),
        }
    }
}

/// Encode `timelocks` for a ledger kind.
pub fn pack_timelocks(
    kind: LedgerKind,
    timelocks: &Timelocks,
) -> Result<PackedTimelocks, InvariantViolation> {
    match kind {
        LedgerKind::Evm => pack_evm_timelocks(timelocks).map(PackedTimelocks::Evm),
        LedgerKind::Near => pack_near_timelocks(timelocks).map(PackedTimelocks::Near),
    }
}

/// Pack into a single `uint256`.
pub fn pack_evm_timelocks(timelocks: &Timelocks) -> Result<U256, InvariantViolation> {
    timelocks.schedule.validate()?;
    let deployed_at = u32::try_from(timelocks.deployed_at)
        .map_err(|_| InvariantViolation::TimelockOverflow(timelocks.deployed_at))?;

    let mut packed = U256::from(deployed_at) << DEPLOYED_AT_OFFSET;
    for stage in TimelockStage::ALL {
        let offset = U256::from(timelocks.schedule.offset(stage));
        packed = packed | (offset << (stage.index() * STAGE_BITS));
    }
    Ok(packed)
}

/// Unpack a `uint256` produced by [`pack_evm_timelocks`].
pub fn unpack_evm_timelocks(packed: U256) -> Result<Timelocks, InvariantViolation> {
    let slot = |bit: usize| -> u32 { ((packed >> bit) & U256::from(u32::MAX)).low_u32() };
    let schedule = TimelockSchedule::new(
        slot(TimelockStage::PrivateWithdrawal.index() * STAGE_BITS),
        slot(TimelockStage::PublicWithdrawal.index() * STAGE_BITS),
        slot(TimelockStage::Cancellation.index() * STAGE_BITS),
        slot(TimelockStage::Rescue.index() * STAGE_BITS),
    )?;
    Ok(Timelocks::new(u64::from(slot(DEPLOYED_AT_OFFSET)), schedule))
}

/// Convert to the NEAR record.
pub fn pack_near_timelocks(timelocks: &Timelocks) -> Result<NearTimelocks, InvariantViolation> {
    timelocks.schedule.validate()?;
    let deployed_at = timelocks
        .deployed_at
        .checked_mul(NANOS_PER_SEC)
        .ok_or(InvariantViolation::TimelockOverflow(timelocks.deployed_at))?;
    let schedule = &timelocks.schedule;
    Ok(NearTimelocks {
        deployed_at,
        withdrawal_delay: u64::from(schedule.private_withdrawal),
        public_withdrawal_delay: u64::from(schedule.public_withdrawal),
        cancellation_delay: u64::from(schedule.cancellation),
        rescue_delay: u64::from(schedule.rescue),
    })
}

/// Convert a NEAR record back. Sub-second deployment precision is dropped.
pub fn unpack_near_timelocks(record: &NearTimelocks) -> Result<Timelocks, InvariantViolation> {
    let narrow = |value: u64| u32::try_from(value).map_err(|_| InvariantViolation::TimelockOverflow(value));
    let schedule = TimelockSchedule::new(
        narrow(record.withdrawal_delay)?,
        narrow(record.public_withdrawal_delay)?,
        narrow(record.cancellation_delay)?,
        narrow(record.rescue_delay)?,
    )?;
    Ok(Timelocks::new(record.deployed_at / NANOS_PER_SEC, schedule))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timelocks() -> Timelocks {
        Timelocks::new(
            1_700_000_000,
            TimelockSchedule::new(144, 1_800, 7_200, 604_800).unwrap(),
        )
    }

    #[test]
    fn test_evm_slot_layout() {
        let packed = pack_evm_timelocks(&timelocks()).unwrap();
        assert_eq!(packed.low_u32(), 144);
        assert_eq!((packed >> 32).low_u32(), 1_800);
        assert_eq!((packed >> 64).low_u32(), 7_200);
        assert_eq!((packed >> 96).low_u32(), 604_800);
        assert_eq!((packed >> 128).low_u32(), 0);
        assert_eq!((packed >> 224).low_u32(), 1_700_000_000);
    }

    #[test]
    fn test_evm_roundtrip() {
        let packed = pack_evm_timelocks(&timelocks()).unwrap();
        assert_eq!(unpack_evm_timelocks(packed).unwrap(), timelocks());
    }

    #[test]
    fn test_evm_deployed_at_overflow() {
        let mut t = timelocks();
        t.deployed_at = u64::from(u32::MAX) + 1;
        assert_eq!(
            pack_evm_timelocks(&t),
            Err(InvariantViolation::TimelockOverflow(u64::from(u32::MAX) + 1))
        );
    }

    #[test]
    fn test_evm_rejects_unordered_word() {
        // cancellation slot left at zero
        let word = U256::from(10u32) | (U256::from(20u32) << 32) | (U256::from(40u32) << 96);
        assert!(unpack_evm_timelocks(word).is_err());
    }

    #[test]
    fn test_near_record() {
        let record = pack_near_timelocks(&timelocks()).unwrap();
        assert_eq!(record.deployed_at, 1_700_000_000 * NANOS_PER_SEC);
        assert_eq!(record.cancellation_delay, 7_200);
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["rescue_delay"], 604_800);
        assert_eq!(unpack_near_timelocks(&record).unwrap(), timelocks());
    }

    #[test]
    fn test_near_rejects_wide_delay() {
        let mut record = pack_near_timelocks(&timelocks()).unwrap();
        record.rescue_delay = u64::from(u32::MAX) + 5;
        assert!(matches!(
            unpack_near_timelocks(&record),
            Err(InvariantViolation::TimelockOverflow(_))
        ));
    }

    #[test]
    fn test_pack_dispatch() {
        let t = timelocks();
        for kind in [LedgerKind::Evm, LedgerKind::Near] {
            let packed = pack_timelocks(kind, &t).unwrap();
            assert_eq!(packed.unpack().unwrap(), t);
        }
    }
}
