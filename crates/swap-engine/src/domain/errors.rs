//! # Domain Errors
//!
//! Error taxonomy for swap orchestration.
//!
//! | Error | Raised | Order effect |
//! |-------|--------|--------------|
//! | `ValidationError` | before any side effect | unchanged |
//! | `ChainCallError` | by an escrow adapter | `Failed` during a leg |
//! | `InvariantViolation` | internal consistency check | unchanged (bug signal) |
//! | `PartialFailure` | one leg succeeded, its pair failed | `Failed`, recoverable |

use super::value_objects::{EscrowOperation, LedgerId, LedgerKind, SwapId, SwapStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hash type (32-byte SHA-256 / Keccak-256 digest).
pub type Hash = [u8; 32];

/// Request rejected before any side effect.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Source and destination ledger are the same.
    #[error("Source and destination ledger are identical: {0}")]
    SameLedger(LedgerId),

    /// No adapter registered for the ledger.
    #[error("Unknown ledger: {0}")]
    UnknownLedger(LedgerId),

    /// Zero amount.
    #[error("Amount must be positive: {field}")]
    ZeroAmount {
        /// Offending request field
        field: &'static str,
    },

    /// Address does not parse for the ledger kind.
    #[error("Invalid address for {ledger}: {address}")]
    InvalidAddress {
        /// Ledger the address was meant for
        ledger: LedgerId,
        /// Raw address
        address: String,
    },

    /// Token does not parse for the ledger kind.
    #[error("Invalid token for {ledger}: {token}")]
    InvalidToken {
        /// Ledger the token was meant for
        ledger: LedgerId,
        /// Raw token reference
        token: String,
    },

    /// Slippage tolerance above 100%.
    #[error("Slippage tolerance out of range: {0} bps")]
    InvalidSlippage(u32),

    /// Requested secret length is below the minimum.
    #[error("Secret too short: {got} bytes, minimum {min}")]
    SecretTooShort {
        /// Requested length
        got: usize,
        /// Minimum length
        min: usize,
    },

    /// Requested secret length is above the maximum.
    #[error("Secret too long: {got} bytes, maximum {max}")]
    SecretTooLong {
        /// Requested length
        got: usize,
        /// Maximum length
        max: usize,
    },

    /// No order with this id.
    #[error("Swap not found: {0}")]
    SwapNotFound(SwapId),

    /// Operation not permitted in the order's current state.
    #[error("Operation {operation} not permitted in state {status}")]
    WrongState {
        /// Requested operation
        operation: &'static str,
        /// Current order status
        status: SwapStatus,
    },

    /// A timelock window the operation needs has not opened yet.
    #[error("{window} window on {ledger} opens at {opens_at} (now {now})")]
    WindowNotOpen {
        /// Ledger of the escrow
        ledger: LedgerId,
        /// Window name
        window: &'static str,
        /// Absolute opening time (unix seconds)
        opens_at: u64,
        /// Current time
        now: u64,
    },

    /// A timelock window the operation needs has already closed.
    #[error("{window} window on {ledger} closed at {closed_at} (now {now})")]
    WindowClosed {
        /// Ledger of the escrow
        ledger: LedgerId,
        /// Window name
        window: &'static str,
        /// Absolute closing time (unix seconds)
        closed_at: u64,
        /// Current time
        now: u64,
    },

    /// Recovery requested for an order that is not a recoverable partial failure.
    #[error("Swap {0} is not a recoverable partial failure")]
    NotRecoverable(SwapId),
}

/// Classification of an escrow adapter failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainCallKind {
    /// Transaction included but reverted.
    Reverted,
    /// No confirmation within the allotted time; ledger state unknown.
    Timeout,
    /// Attached value below the required deposit.
    InsufficientFunds,
    /// Node or executor refused the call.
    RateLimited,
    /// Escrow not in a state (or window) that permits the call.
    InvalidState,
}

/// Failure of a single escrow adapter call.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{operation} on {ledger} failed ({kind:?}): {detail}")]
pub struct ChainCallError {
    /// Ledger the call targeted.
    pub ledger: LedgerId,
    /// Escrow operation.
    pub operation: EscrowOperation,
    /// Failure class.
    pub kind: ChainCallKind,
    /// Human-readable detail (revert reason, RPC message).
    pub detail: String,
}

impl ChainCallError {
    /// Create a new chain call error.
    pub fn new(
        ledger: LedgerId,
        operation: EscrowOperation,
        kind: ChainCallKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            operation,
            kind,
            detail: detail.into(),
        }
    }

    /// Shorthand for a timeout.
    pub fn timeout(ledger: LedgerId, operation: EscrowOperation, detail: impl Into<String>) -> Self {
        Self::new(ledger, operation, ChainCallKind::Timeout, detail)
    }

    /// Whether a later manual retry may succeed.
    ///
    /// Classification only: the coordinator never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ChainCallKind::Timeout | ChainCallKind::RateLimited)
    }

    /// Whether the ledger may or may not have applied the call.
    pub fn is_unknown_outcome(&self) -> bool {
        self.kind == ChainCallKind::Timeout
    }
}

/// Internal consistency violation. Always a bug signal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    /// sha256(secret) != hashlock.
    #[error("Secret does not match hashlock")]
    SecretMismatch,

    /// Timelock stages are not strictly increasing.
    #[error("Timelock stages not strictly increasing: {0}")]
    TimelockOrdering(String),

    /// Destination withdrawal window overlaps source cancellation.
    #[error("Destination withdrawal closes at {dst_cancellation}, source cancellation opens at {src_cancellation}, required margin {margin}")]
    CrossEscrowWindow {
        /// Absolute destination cancellation boundary
        dst_cancellation: u64,
        /// Absolute source cancellation boundary
        src_cancellation: u64,
        /// Required margin in seconds
        margin: u64,
    },

    /// Invalid swap state transition.
    #[error("Invalid swap transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: SwapStatus,
        /// Attempted state
        to: SwapStatus,
    },

    /// Timelock value does not fit its 32-bit slot.
    #[error("Timelock value exceeds 32-bit slot: {0}")]
    TimelockOverflow(u64),

    /// Address or token of the wrong ledger kind.
    #[error("Expected {expected:?} value for {field}")]
    LedgerMismatch {
        /// Kind the encoder needs
        expected: LedgerKind,
        /// Field being encoded
        field: &'static str,
    },

    /// Order is missing an escrow it should have in its state.
    #[error("Swap {swap_id} has no {role} escrow")]
    MissingEscrow {
        /// Order id
        swap_id: SwapId,
        /// "source" or "destination"
        role: &'static str,
    },
}

/// Escrow window or role check failure, raised before submitting a call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// Window opens later.
    #[error("{action} not allowed before {opens_at} (now {now})")]
    TooEarly {
        /// Escrow action
        action: &'static str,
        /// Opening time
        opens_at: u64,
        /// Current time
        now: u64,
    },

    /// Window already closed.
    #[error("{action} not allowed from {closed_at} (now {now})")]
    Closed {
        /// Escrow action
        action: &'static str,
        /// Closing time
        closed_at: u64,
        /// Current time
        now: u64,
    },

    /// Caller may not perform the action.
    #[error("caller not authorized to {action}")]
    Unauthorized {
        /// Escrow action
        action: &'static str,
    },
}

/// What kind of pair operation left the swap half done.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartialFailureKind {
    /// Destination withdrawn (secret public) but source withdrawal failed.
    SourceWithdrawal,
    /// At least one escrow cancellation failed.
    Cancellation,
}

/// One leg succeeded and its pair failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Swap {swap_id} partially failed ({kind:?}): {cause}")]
pub struct PartialFailure {
    /// Order id
    pub swap_id: SwapId,
    /// Which pair operation failed
    pub kind: PartialFailureKind,
    /// The failing adapter call
    pub cause: ChainCallError,
}

/// Top-level error returned by the coordinator.
#[derive(Debug, Error)]
pub enum SwapError {
    /// Rejected before side effects.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Escrow adapter failure.
    #[error("Chain call error: {0}")]
    ChainCall(#[from] ChainCallError),

    /// Internal invariant violated.
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Half-done swap.
    #[error("Partial failure: {0}")]
    PartialFailure(#[from] PartialFailure),

    /// Repository backend failure.
    #[error("Repository error: {0}")]
    Repository(String),
}
