//! # Swap Engine
//!
//! Cross-ledger asset swaps using hash time-locked escrows (HTLC).
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Move value between an EVM ledger and NEAR without trusting either side:
//! - One escrow per ledger, both locked by the same SHA-256 hashlock
//! - Four-stage timelock schedule per escrow (private, public, cancel, rescue)
//! - Source escrow outlives the destination escrow by a safety margin
//! - Revealing the secret on the destination makes the source claimable
//!
//! ## Safety Rules
//!
//! | Rule | Enforced by |
//! |------|-------------|
//! | Hashlock = SHA-256(secret) | `invariant_secret_matches` |
//! | Stage offsets strictly increasing | `invariant_timelock_ordering` |
//! | Source cancel > destination cancel + margin | `invariant_cross_escrow_windows` |
//! | One operation per swap at a time | `SwapLockRegistry` |
//!
//! ## Module Structure
//!
//! ```text
//! swap-engine/
//! ├── domain/          # SwapOrder, escrows, timelocks, errors, events
//! ├── algorithms/      # Hashlock, timelock codecs, escrow addresses, schedules
//! ├── ports/           # SwapCoordinatorApi, EscrowPort, LedgerTransport, ...
//! ├── adapters/        # EVM / NEAR escrow adapters, simulated ledger, storage
//! ├── service/         # SwapCoordinator, per-ledger executor, per-swap locks
//! └── config.rs        # Coordinator and ledger settings
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports
pub use adapters::{
    BroadcastEventBus, EvmEscrowAdapter, EvmEscrowConfig, InMemorySwapRepository, ManualClock,
    NearEscrowAdapter, NearEscrowConfig, NoOpPublisher, SimulatedLedger, SystemClock,
};
pub use algorithms::{compute_hashlock, generate_secret, plan_schedules, verify};
pub use config::{ConfigError, CoordinatorConfig, LedgerConfig, LedgerLimits};
pub use domain::{
    ChainCallError, ChainCallKind, EscrowRef, EscrowRole, EscrowStatus, FailureDetail,
    InvariantViolation, LedgerAddress, LedgerId, LedgerKind, PartialFailure, PartialFailureKind,
    SecureSecret, SwapError, SwapEvent, SwapId, SwapOrder, SwapRequest, SwapStatus,
    TimelockSchedule, TokenRef, TxRef, ValidationError,
};
pub use ports::{
    Clock, EscrowPort, LedgerTransport, SwapCoordinatorApi, SwapEventPublisher, SwapRepository,
};
pub use service::SwapCoordinator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
