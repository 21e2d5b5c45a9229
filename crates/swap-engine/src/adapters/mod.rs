//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound ports: escrow adapters per ledger kind, the
//! simulated ledger transport, storage, event fan-out and clocks.

mod clock;
mod escrow_common;
mod event_bus;
mod evm_escrow;
mod near_escrow;
mod repository;
mod simulated_ledger;
mod wire_decode;

pub use clock::{ManualClock, SystemClock};
pub use event_bus::{BroadcastEventBus, NoOpPublisher, DEFAULT_CHANNEL_CAPACITY};
pub use evm_escrow::{
    EvmEscrowAdapter, EvmEscrowConfig, CANCEL_SIGNATURE, CREATE_DST_SIGNATURE,
    CREATE_SRC_SIGNATURE, RESCUE_SIGNATURE, WITHDRAW_SIGNATURE,
};
pub use near_escrow::{
    decode_secret_arg, encode_secret_arg, immutables_json, NearEscrowAdapter, NearEscrowConfig,
    CANCEL_METHOD, CREATE_DST_METHOD, CREATE_SRC_METHOD, RESCUE_METHOD, WITHDRAW_METHOD,
};
pub use repository::InMemorySwapRepository;
pub use simulated_ledger::SimulatedLedger;
