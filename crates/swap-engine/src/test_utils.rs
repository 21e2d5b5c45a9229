//! Test doubles for the outbound ports.
//!
//! Enabled for unit tests and, through the `test-utils` feature, for
//! integration tests and downstream crates.

use crate::algorithms::{compute_hashlock, verify};
use crate::domain::{
    ChainCallError, ChainCallKind, EscrowImmutables, EscrowOperation, EscrowRef, EscrowRole,
    EscrowStatus, InvariantViolation, LedgerAddress, LedgerId, LedgerKind, NewSwapOrder,
    SecureSecret, SwapEvent, SwapId, SwapOrder, SwapRequest, TimelockSchedule, TokenRef, TxRef,
};
use crate::ports::{EscrowPort, SwapEventPublisher};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One adapter call seen by a mock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockCall {
    /// Ledger called
    pub ledger: LedgerId,
    /// Operation called
    pub operation: EscrowOperation,
}

/// Call log shared between mocks, to assert cross-ledger ordering.
pub type CallLog = Arc<Mutex<Vec<MockCall>>>;

/// Scriptable `EscrowPort`.
///
/// Calls always succeed unless a fault is registered for the operation.
/// Withdrawals check the secret against the hashlock.
pub struct MockEscrowPort {
    ledger: LedgerId,
    resolver: LedgerAddress,
    log: CallLog,
    faults: Mutex<HashMap<EscrowOperation, ChainCallKind>>,
    delay: Mutex<Option<Duration>>,
    statuses: Mutex<HashMap<LedgerAddress, EscrowStatus>>,
    nonce: AtomicU64,
}

impl MockEscrowPort {
    /// Mock with its own call log.
    pub fn new(ledger: LedgerId) -> Self {
        Self::with_log(ledger, CallLog::default())
    }

    /// Mock recording into a shared call log.
    pub fn with_log(ledger: LedgerId, log: CallLog) -> Self {
        let resolver = match ledger.kind() {
            LedgerKind::Evm => LedgerAddress::Evm([0xee; 20]),
            LedgerKind::Near => LedgerAddress::Near("resolver.near".into()),
        };
        Self {
            ledger,
            resolver,
            log,
            faults: Mutex::new(HashMap::new()),
            delay: Mutex::new(None),
            statuses: Mutex::new(HashMap::new()),
            nonce: AtomicU64::new(0),
        }
    }

    /// Fail every future `operation` with `kind`.
    pub fn fail_on(&self, operation: EscrowOperation, kind: ChainCallKind) {
        self.faults.lock().insert(operation, kind);
    }

    /// Remove all registered faults.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Calls made to this ledger, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.log
            .lock()
            .iter()
            .filter(|c| c.ledger == self.ledger)
            .copied()
            .collect()
    }

    /// Operations called on this ledger, in order.
    pub fn operations(&self) -> Vec<EscrowOperation> {
        self.calls().into_iter().map(|c| c.operation).collect()
    }

    async fn enter(&self, operation: EscrowOperation) -> Result<(), ChainCallError> {
        self.log.lock().push(MockCall {
            ledger: self.ledger,
            operation,
        });
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let fault = self.faults.lock().get(&operation).copied();
        match fault {
            Some(kind) => Err(ChainCallError::new(self.ledger, operation, kind, "injected fault")),
            None => Ok(()),
        }
    }

    fn next_tx(&self) -> TxRef {
        let n = self.nonce.fetch_add(1, Ordering::SeqCst);
        TxRef {
            ledger: self.ledger,
            hash: format!("mock-{}-{n}", self.ledger),
        }
    }

    async fn create(
        &self,
        operation: EscrowOperation,
        role: EscrowRole,
        immutables: EscrowImmutables,
    ) -> Result<EscrowRef, ChainCallError> {
        self.enter(operation).await?;
        let address = self
            .compute_address(&immutables, role)
            .map_err(|e| ChainCallError::new(self.ledger, operation, ChainCallKind::InvalidState, e.to_string()))?;
        self.statuses.lock().insert(address.clone(), EscrowStatus::Active);
        Ok(EscrowRef {
            ledger: self.ledger,
            role,
            address,
            immutables,
            creation_tx: self.next_tx(),
        })
    }

    fn settle(&self, escrow: &EscrowRef, status: EscrowStatus) -> TxRef {
        self.statuses.lock().insert(escrow.address.clone(), status);
        self.next_tx()
    }
}

#[async_trait]
impl EscrowPort for MockEscrowPort {
    fn ledger(&self) -> LedgerId {
        self.ledger
    }

    fn resolver_address(&self) -> &LedgerAddress {
        &self.resolver
    }

    fn required_deposit(&self, immutables: &EscrowImmutables) -> u128 {
        immutables.safety_deposit
    }

    fn compute_address(
        &self,
        immutables: &EscrowImmutables,
        role: EscrowRole,
    ) -> Result<LedgerAddress, InvariantViolation> {
        let digest: [u8; 32] = Sha256::new()
            .chain_update(immutables.order_hash)
            .chain_update(role.prefix())
            .finalize()
            .into();
        Ok(match self.ledger.kind() {
            LedgerKind::Evm => {
                let mut address = [0u8; 20];
                address.copy_from_slice(&digest[12..]);
                LedgerAddress::Evm(address)
            }
            LedgerKind::Near => LedgerAddress::Near(format!("{}-{}.mock.near", role.prefix(), hex::encode(&digest[..8]))),
        })
    }

    async fn create_source(&self, immutables: EscrowImmutables, _deposit: u128) -> Result<EscrowRef, ChainCallError> {
        self.create(EscrowOperation::CreateSource, EscrowRole::Source, immutables)
            .await
    }

    async fn create_destination(&self, immutables: EscrowImmutables, _deposit: u128) -> Result<EscrowRef, ChainCallError> {
        self.create(EscrowOperation::CreateDestination, EscrowRole::Destination, immutables)
            .await
    }

    async fn withdraw(&self, escrow: &EscrowRef, secret: &SecureSecret) -> Result<TxRef, ChainCallError> {
        self.enter(EscrowOperation::Withdraw).await?;
        if !verify(secret.as_bytes(), &escrow.immutables.hashlock) {
            return Err(ChainCallError::new(
                self.ledger,
                EscrowOperation::Withdraw,
                ChainCallKind::Reverted,
                "invalid secret",
            ));
        }
        Ok(self.settle(escrow, EscrowStatus::Withdrawn))
    }

    async fn cancel(&self, escrow: &EscrowRef) -> Result<TxRef, ChainCallError> {
        self.enter(EscrowOperation::Cancel).await?;
        Ok(self.settle(escrow, EscrowStatus::Cancelled))
    }

    async fn rescue(&self, escrow: &EscrowRef) -> Result<TxRef, ChainCallError> {
        self.enter(EscrowOperation::Rescue).await?;
        Ok(self.settle(escrow, EscrowStatus::Rescued))
    }

    async fn status(&self, escrow: &EscrowRef) -> Result<EscrowStatus, ChainCallError> {
        self.enter(EscrowOperation::Status).await?;
        self.statuses
            .lock()
            .get(&escrow.address)
            .copied()
            .ok_or_else(|| ChainCallError::new(self.ledger, EscrowOperation::Status, ChainCallKind::InvalidState, "no escrow"))
    }
}

/// Publisher that keeps every event.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<SwapEvent>>,
}

impl RecordingPublisher {
    /// Empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events published so far.
    pub fn events(&self) -> Vec<SwapEvent> {
        self.events.lock().clone()
    }

    /// Wire names of the events published so far.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(SwapEvent::name).collect()
    }
}

#[async_trait]
impl SwapEventPublisher for RecordingPublisher {
    async fn publish(&self, event: SwapEvent) -> usize {
        self.events.lock().push(event);
        1
    }
}

/// Ethereum user address used by the samples.
pub const SAMPLE_EVM_USER: &str = "0x1111111111111111111111111111111111111111";
/// NEAR user account used by the samples.
pub const SAMPLE_NEAR_USER: &str = "alice.near";

fn sample_user(ledger: LedgerId) -> &'static str {
    match ledger.kind() {
        LedgerKind::Evm => SAMPLE_EVM_USER,
        LedgerKind::Near => SAMPLE_NEAR_USER,
    }
}

/// Native-asset request between two ledgers.
pub fn sample_request(source: LedgerId, destination: LedgerId) -> SwapRequest {
    SwapRequest {
        source_ledger: source,
        destination_ledger: destination,
        source_token: "native".into(),
        destination_token: "native".into(),
        amount: 1_000_000_000_000_000_000,
        destination_amount: 2_000_000_000_000_000_000_000_000,
        user_address: sample_user(source).into(),
        recipient_address: sample_user(destination).into(),
        slippage_bps: 50,
    }
}

/// Ethereum to NEAR order in `Created`, as the coordinator would store it.
pub fn sample_order(created_at: u64) -> SwapOrder {
    let secret = SecureSecret::new_unchecked(vec![0x42; 32]);
    let hashlock = compute_hashlock(secret.as_bytes());
    SwapOrder::new(NewSwapOrder {
        id: SwapId::new(),
        source_ledger: LedgerId::Ethereum,
        destination_ledger: LedgerId::Near,
        source_token: TokenRef::Native,
        destination_token: TokenRef::Native,
        amount: 1_000,
        destination_amount: 2_000,
        maker_address: LedgerAddress::Evm([0x11; 20]),
        recipient_address: LedgerAddress::Near(SAMPLE_NEAR_USER.into()),
        slippage_bps: 50,
        order_hash: [0xab; 32],
        secret,
        hashlock,
        source_schedule: TimelockSchedule {
            private_withdrawal: 144,
            public_withdrawal: 1_800,
            cancellation: 7_200,
            rescue: 604_800,
        },
        destination_schedule: TimelockSchedule {
            private_withdrawal: 2,
            public_withdrawal: 900,
            cancellation: 3_600,
            rescue: 604_800,
        },
        created_at,
    })
}
