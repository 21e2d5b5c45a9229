//! # Algorithms Module
//!
//! Hashlock codec, timelock codecs, escrow address derivation and schedule
//! planning. Pure functions; no I/O.

pub mod address;
pub mod schedule;
pub mod secret;
pub mod timelock_codec;

pub use address::{
    create2_address, evm_escrow_address, function_selector, keccak256, near_escrow_account,
};
pub use schedule::{plan_schedules, SwapSchedules};
pub use secret::{
    compute_hashlock, compute_order_hash, generate_secret, generate_secret_with_len, verify,
};
pub use timelock_codec::{
    pack_evm_timelocks, pack_near_timelocks, pack_timelocks, unpack_evm_timelocks,
    unpack_near_timelocks, NearTimelocks, PackedTimelocks,
};
