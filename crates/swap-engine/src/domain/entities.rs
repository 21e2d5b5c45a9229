//! # Domain Entities
//!
//! Escrow immutables, escrow references and the swap order record.

use super::errors::{ChainCallError, ChainCallKind, Hash, InvariantViolation, PartialFailureKind};
use super::secure_secret::SecureSecret;
use super::timelocks::{Caller, TimelockSchedule, Timelocks};
use super::value_objects::{
    EscrowOperation, EscrowRole, LedgerAddress, LedgerId, SwapId, SwapStatus, TokenRef, TxRef,
};
use serde::{Deserialize, Serialize};

/// SHA-256 digest of the swap secret.
pub type Hashlock = Hash;

/// Parameters fixed at escrow creation. Identical semantic content on both
/// ledgers; the escrow address is derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowImmutables {
    /// Order hash shared by both escrows.
    pub order_hash: Hash,
    /// Hashlock shared by both escrows.
    pub hashlock: Hashlock,
    /// Party whose funds are refunded on source cancellation.
    pub maker: LedgerAddress,
    /// Resolver account driving the escrow.
    pub taker: LedgerAddress,
    /// Locked asset.
    pub token: TokenRef,
    /// Locked amount (base units).
    pub amount: u128,
    /// Native safety deposit paid to whoever executes withdraw/cancel.
    pub safety_deposit: u128,
    /// Anchored timelocks.
    pub timelocks: Timelocks,
}

impl EscrowImmutables {
    /// Classify `address` against this escrow's parties.
    pub fn caller(&self, address: &LedgerAddress, has_access_token: bool) -> Caller {
        if *address == self.taker {
            Caller::Taker
        } else if *address == self.maker {
            Caller::Maker
        } else if has_access_token {
            Caller::AccessHolder
        } else {
            Caller::Stranger
        }
    }

    /// Party receiving the funds on withdrawal.
    pub fn withdrawal_recipient(&self, role: EscrowRole) -> &LedgerAddress {
        match role {
            EscrowRole::Source => &self.taker,
            EscrowRole::Destination => &self.maker,
        }
    }

    /// Party refunded on cancellation.
    pub fn refund_recipient(&self, role: EscrowRole) -> &LedgerAddress {
        match role {
            EscrowRole::Source => &self.maker,
            EscrowRole::Destination => &self.taker,
        }
    }
}

/// Everything needed to act on a created escrow later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRef {
    /// Ledger the escrow lives on.
    pub ledger: LedgerId,
    /// Source or destination.
    pub role: EscrowRole,
    /// Escrow contract / account.
    pub address: LedgerAddress,
    /// Creation parameters.
    pub immutables: EscrowImmutables,
    /// Creation transaction.
    pub creation_tx: TxRef,
}

/// Swap request handed over by the transport layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Ledger the user pays on.
    pub source_ledger: LedgerId,
    /// Ledger the user receives on.
    pub destination_ledger: LedgerId,
    /// Source asset ("native" or a contract address).
    pub source_token: String,
    /// Destination asset.
    pub destination_token: String,
    /// Amount locked on the source ledger.
    pub amount: u128,
    /// Amount released on the destination ledger.
    pub destination_amount: u128,
    /// User's source-ledger address.
    pub user_address: String,
    /// User's destination-ledger address.
    pub recipient_address: String,
    /// Slippage tolerance in basis points.
    pub slippage_bps: u32,
}

/// Failure classification stored on a failed order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// A single adapter call failed during a leg.
    ChainCall(ChainCallKind),
    /// One leg succeeded and its pair failed.
    PartialFailure(PartialFailureKind),
}

/// Why an order ended in `Failed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Failure class.
    pub kind: FailureKind,
    /// Ledger of the failing call.
    pub ledger: LedgerId,
    /// Failing operation.
    pub operation: EscrowOperation,
    /// Adapter detail.
    pub detail: String,
    /// Whether a manual retry may succeed.
    pub retryable: bool,
    /// The ledger may or may not have applied the call.
    pub unknown_ledger_state: bool,
    /// Destination withdrawn, source withdrawal can be retried by an operator.
    pub partial_failure_recoverable: bool,
    /// At least one cancellation failed.
    pub partial_cancellation: bool,
}

impl FailureDetail {
    /// Failure of a single leg call.
    pub fn from_call(err: &ChainCallError) -> Self {
        Self {
            kind: FailureKind::ChainCall(err.kind),
            ledger: err.ledger,
            operation: err.operation,
            detail: err.detail.clone(),
            retryable: err.is_retryable(),
            unknown_ledger_state: err.is_unknown_outcome(),
            partial_failure_recoverable: false,
            partial_cancellation: false,
        }
    }

    /// Destination withdrawn, source withdrawal failed.
    pub fn source_withdrawal_failed(err: &ChainCallError) -> Self {
        Self {
            kind: FailureKind::PartialFailure(PartialFailureKind::SourceWithdrawal),
            partial_failure_recoverable: true,
            ..Self::from_call(err)
        }
    }

    /// Some cancellation failed.
    pub fn cancellation_failed(err: &ChainCallError) -> Self {
        Self {
            kind: FailureKind::PartialFailure(PartialFailureKind::Cancellation),
            partial_cancellation: true,
            ..Self::from_call(err)
        }
    }
}

/// Parameters for a new order, produced by request validation.
#[derive(Clone, Debug)]
pub struct NewSwapOrder {
    /// Order id.
    pub id: SwapId,
    /// Source ledger.
    pub source_ledger: LedgerId,
    /// Destination ledger.
    pub destination_ledger: LedgerId,
    /// Source asset.
    pub source_token: TokenRef,
    /// Destination asset.
    pub destination_token: TokenRef,
    /// Source amount.
    pub amount: u128,
    /// Destination amount.
    pub destination_amount: u128,
    /// User on the source ledger (source escrow maker).
    pub maker_address: LedgerAddress,
    /// User on the destination ledger (destination escrow maker).
    pub recipient_address: LedgerAddress,
    /// Slippage tolerance.
    pub slippage_bps: u32,
    /// Order hash.
    pub order_hash: Hash,
    /// Swap secret.
    pub secret: SecureSecret,
    /// Hashlock of `secret`.
    pub hashlock: Hashlock,
    /// Planned source schedule.
    pub source_schedule: TimelockSchedule,
    /// Planned destination schedule.
    pub destination_schedule: TimelockSchedule,
    /// Creation time.
    pub created_at: u64,
}

/// One in-flight swap.
///
/// Created and mutated only by the coordinator; never resurrected once
/// terminal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOrder {
    /// Order id.
    pub id: SwapId,
    /// Source ledger.
    pub source_ledger: LedgerId,
    /// Destination ledger.
    pub destination_ledger: LedgerId,
    /// Source asset.
    pub source_token: TokenRef,
    /// Destination asset.
    pub destination_token: TokenRef,
    /// Source amount.
    pub amount: u128,
    /// Destination amount.
    pub destination_amount: u128,
    /// User on the source ledger.
    pub maker_address: LedgerAddress,
    /// User on the destination ledger.
    pub recipient_address: LedgerAddress,
    /// Slippage tolerance (bps).
    pub slippage_bps: u32,
    /// Order hash shared by both escrows.
    pub order_hash: Hash,
    /// Hashlock shared by both escrows.
    pub hashlock: Hashlock,
    /// Swap secret, held until reveal.
    pub secret: SecureSecret,
    /// Source escrow schedule.
    pub source_schedule: TimelockSchedule,
    /// Destination escrow schedule.
    pub destination_schedule: TimelockSchedule,
    /// Current status.
    pub status: SwapStatus,
    /// Source escrow, once created.
    pub source_escrow: Option<EscrowRef>,
    /// Destination escrow, once created.
    pub destination_escrow: Option<EscrowRef>,
    /// Failure detail when `Failed`.
    pub error: Option<FailureDetail>,
    /// Creation time (unix seconds).
    pub created_at: u64,
    /// Last update (unix seconds).
    pub updated_at: u64,
}

impl SwapOrder {
    /// Create a new order in `Created`.
    pub fn new(params: NewSwapOrder) -> Self {
        Self {
            id: params.id,
            source_ledger: params.source_ledger,
            destination_ledger: params.destination_ledger,
            source_token: params.source_token,
            destination_token: params.destination_token,
            amount: params.amount,
            destination_amount: params.destination_amount,
            maker_address: params.maker_address,
            recipient_address: params.recipient_address,
            slippage_bps: params.slippage_bps,
            order_hash: params.order_hash,
            hashlock: params.hashlock,
            secret: params.secret,
            source_schedule: params.source_schedule,
            destination_schedule: params.destination_schedule,
            status: SwapStatus::Created,
            source_escrow: None,
            destination_escrow: None,
            error: None,
            created_at: params.created_at,
            updated_at: params.created_at,
        }
    }

    /// Move to `next`, rejecting transitions outside the state machine.
    pub fn transition_to(&mut self, next: SwapStatus, now: u64) -> Result<(), InvariantViolation> {
        if !self.status.can_transition_to(next) {
            return Err(InvariantViolation::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Move to `Failed` with `detail`.
    pub fn fail(&mut self, detail: FailureDetail, now: u64) -> Result<(), InvariantViolation> {
        self.transition_to(SwapStatus::Failed, now)?;
        self.error = Some(detail);
        Ok(())
    }

    /// Escrow on one side, if created.
    pub fn escrow(&self, role: EscrowRole) -> Option<&EscrowRef> {
        match role {
            EscrowRole::Source => self.source_escrow.as_ref(),
            EscrowRole::Destination => self.destination_escrow.as_ref(),
        }
    }

    /// Whether the order failed in a state an operator can recover from.
    pub fn is_recoverable(&self) -> bool {
        self.status == SwapStatus::Failed
            && self
                .error
                .as_ref()
                .is_some_and(|e| e.partial_failure_recoverable)
    }
}
