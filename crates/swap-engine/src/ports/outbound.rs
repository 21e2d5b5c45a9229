//! # Outbound Ports
//!
//! Traits for external dependencies: escrow capabilities per ledger, the raw
//! ledger transport beneath them, order storage, event fan-out and time.

use crate::domain::{
    ChainCallError, EscrowImmutables, EscrowOperation, EscrowRef, EscrowRole, EscrowStatus,
    InvariantViolation, LedgerAddress, LedgerId, SecureSecret, SwapError, SwapEvent, SwapId,
    SwapOrder, TxRef,
};
use async_trait::async_trait;

/// Escrow capability of one ledger - outbound port.
///
/// One adapter per ledger; every method that touches the ledger is a single
/// awaited call that returns once the transaction is confirmed or failed.
#[async_trait]
pub trait EscrowPort: Send + Sync {
    /// Ledger served by this adapter.
    fn ledger(&self) -> LedgerId;

    /// Account the adapter signs as (the escrow taker).
    fn resolver_address(&self) -> &LedgerAddress;

    /// Native value that must be attached to create an escrow.
    fn required_deposit(&self, immutables: &EscrowImmutables) -> u128;

    /// Deterministic escrow address. Pure.
    fn compute_address(
        &self,
        immutables: &EscrowImmutables,
        role: EscrowRole,
    ) -> Result<LedgerAddress, InvariantViolation>;

    /// Create the source escrow.
    async fn create_source(
        &self,
        immutables: EscrowImmutables,
        deposit: u128,
    ) -> Result<EscrowRef, ChainCallError>;

    /// Create the destination escrow.
    async fn create_destination(
        &self,
        immutables: EscrowImmutables,
        deposit: u128,
    ) -> Result<EscrowRef, ChainCallError>;

    /// Withdraw with the secret.
    async fn withdraw(&self, escrow: &EscrowRef, secret: &SecureSecret) -> Result<TxRef, ChainCallError>;

    /// Cancel and refund the funding party.
    async fn cancel(&self, escrow: &EscrowRef) -> Result<TxRef, ChainCallError>;

    /// Sweep funds after the rescue delay.
    async fn rescue(&self, escrow: &EscrowRef) -> Result<TxRef, ChainCallError>;

    /// Current on-ledger escrow state.
    async fn status(&self, escrow: &EscrowRef) -> Result<EscrowStatus, ChainCallError>;
}

/// Semantic content of a ledger call, independent of encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscrowAction {
    /// Deploy an escrow.
    Create {
        /// Source or destination
        role: EscrowRole,
        /// Expected escrow address
        address: LedgerAddress,
        /// Escrow parameters
        immutables: EscrowImmutables,
        /// Attached native value
        deposit: u128,
    },
    /// Withdraw with the secret.
    Withdraw {
        /// Escrow address
        address: LedgerAddress,
        /// Revealed secret
        secret: SecureSecret,
    },
    /// Cancel.
    Cancel {
        /// Escrow address
        address: LedgerAddress,
    },
    /// Rescue.
    Rescue {
        /// Escrow address
        address: LedgerAddress,
    },
}

/// Ledger-specific encoding of a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WirePayload {
    /// EVM transaction.
    Evm {
        /// Target contract
        to: [u8; 20],
        /// Selector + ABI words
        calldata: Vec<u8>,
        /// Attached wei
        value: u128,
    },
    /// NEAR function call.
    Near {
        /// Receiver account
        receiver: String,
        /// Method name
        method: String,
        /// JSON arguments
        args_json: String,
        /// Attached yoctoNEAR
        deposit: u128,
    },
}

/// A signed call ready for submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerCall {
    /// Target ledger.
    pub ledger: LedgerId,
    /// Operation tag.
    pub operation: EscrowOperation,
    /// Signing account.
    pub caller: LedgerAddress,
    /// Semantic action.
    pub action: EscrowAction,
    /// Wire encoding.
    pub payload: WirePayload,
}

/// Outcome of an included transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction.
    pub tx: TxRef,
    /// Execution succeeded.
    pub success: bool,
    /// Revert / panic message on failure.
    pub revert_reason: Option<String>,
    /// Block timestamp (unix seconds).
    pub block_time: u64,
}

/// Raw ledger access - outbound port beneath the escrow adapters.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Submit a call; returns once the node accepted it.
    async fn submit(&self, call: LedgerCall) -> Result<TxRef, ChainCallError>;

    /// Receipt of a submitted call, once included.
    async fn receipt(&self, tx: &TxRef) -> Result<Option<Receipt>, ChainCallError>;

    /// View call: escrow status, `None` if nothing is deployed there.
    async fn escrow_status(&self, address: &LedgerAddress) -> Result<Option<EscrowStatus>, ChainCallError>;

    /// Latest block time (unix seconds).
    fn now(&self) -> u64;
}

/// Swap order storage - outbound port.
#[async_trait]
pub trait SwapRepository: Send + Sync {
    /// Fetch an order.
    async fn get(&self, id: &SwapId) -> Result<Option<SwapOrder>, SwapError>;

    /// Insert or replace an order.
    async fn put(&self, order: SwapOrder) -> Result<(), SwapError>;

    /// Remove an order. Returns whether it existed.
    async fn delete(&self, id: &SwapId) -> Result<bool, SwapError>;

    /// All stored orders.
    async fn list(&self) -> Result<Vec<SwapOrder>, SwapError>;
}

/// Lifecycle event fan-out - outbound port.
#[async_trait]
pub trait SwapEventPublisher: Send + Sync {
    /// Publish an event. Returns the number of receivers reached.
    async fn publish(&self, event: SwapEvent) -> usize;
}

/// Wall clock - outbound port.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> u64;
}
