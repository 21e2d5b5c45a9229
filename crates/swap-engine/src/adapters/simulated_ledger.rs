//! Simulated Ledger
//!
//! In-memory `LedgerTransport` that behaves like a ledger hosting the escrow
//! contracts: it enforces the hashlock, timelock windows, caller roles and
//! escrow state, pays out balances, and issues receipts. Used by the node's
//! demo mode and the adapter tests.
//!
//! Calls execute from their wire payload. The payload is decoded as the
//! contract would decode it and must agree with the semantic action; a
//! withdrawal hashes the preimage carried on the wire.
//!
//! Fault injection: revert the next call, withhold receipts (the call still
//! executes, as when an RPC node loses track of an included transaction), or
//! refuse submissions as rate limited.

use super::wire_decode::decode_call;
use crate::algorithms::{keccak256, verify};
use crate::domain::{
    ChainCallError, ChainCallKind, EscrowImmutables, EscrowRole, EscrowStatus, LedgerAddress,
    LedgerId, LedgerKind, TxRef,
};
use crate::ports::{Clock, EscrowAction, LedgerCall, LedgerTransport, Receipt, WirePayload};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Escrow as held by the simulated ledger.
#[derive(Clone, Debug)]
struct SimEscrow {
    role: EscrowRole,
    immutables: EscrowImmutables,
    status: EscrowStatus,
    balance: u128,
}

#[derive(Debug, Default)]
struct Faults {
    revert_next: Option<String>,
    withhold_receipts: bool,
    rate_limited: bool,
}

/// In-memory ledger hosting escrow contracts.
pub struct SimulatedLedger {
    ledger: LedgerId,
    clock: Arc<dyn Clock>,
    escrows: RwLock<HashMap<LedgerAddress, SimEscrow>>,
    receipts: RwLock<HashMap<String, Receipt>>,
    balances: RwLock<HashMap<LedgerAddress, u128>>,
    access_holders: RwLock<HashSet<LedgerAddress>>,
    submitted: RwLock<Vec<LedgerCall>>,
    faults: Mutex<Faults>,
    nonce: AtomicU64,
}

impl SimulatedLedger {
    /// Create an empty ledger whose block time follows `clock`.
    pub fn new(ledger: LedgerId, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            escrows: RwLock::new(HashMap::new()),
            receipts: RwLock::new(HashMap::new()),
            balances: RwLock::new(HashMap::new()),
            access_holders: RwLock::new(HashSet::new()),
            submitted: RwLock::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
            nonce: AtomicU64::new(0),
        }
    }

    /// Ledger id.
    pub fn ledger(&self) -> LedgerId {
        self.ledger
    }

    /// Make the next submitted call revert with `reason`.
    pub fn revert_next(&self, reason: impl Into<String>) {
        self.faults.lock().revert_next = Some(reason.into());
    }

    /// Execute calls but never report their receipts.
    pub fn withhold_receipts(&self, withhold: bool) {
        self.faults.lock().withhold_receipts = withhold;
    }

    /// Refuse submissions.
    pub fn set_rate_limited(&self, limited: bool) {
        self.faults.lock().rate_limited = limited;
    }

    /// Grant the public-withdrawal access credential.
    pub fn grant_access(&self, holder: LedgerAddress) {
        self.access_holders.write().insert(holder);
    }

    /// Native balance paid out to `address` by escrows.
    pub fn balance_of(&self, address: &LedgerAddress) -> u128 {
        self.balances.read().get(address).copied().unwrap_or_default()
    }

    /// Funds still locked in the escrow at `address`.
    pub fn escrow_balance(&self, address: &LedgerAddress) -> Option<u128> {
        self.escrows.read().get(address).map(|e| e.balance)
    }

    /// Every call submitted so far.
    pub fn submitted_calls(&self) -> Vec<LedgerCall> {
        self.submitted.read().clone()
    }

    fn next_tx_hash(&self) -> String {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut preimage = self.ledger.as_str().as_bytes().to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let hash = hex::encode(keccak256(&preimage));
        match self.ledger.kind() {
            LedgerKind::Evm => format!("0x{hash}"),
            LedgerKind::Near => hash,
        }
    }

    fn credit(&self, address: &LedgerAddress, amount: u128) {
        let mut balances = self.balances.write();
        let entry = balances.entry(address.clone()).or_default();
        *entry = entry.saturating_add(amount);
    }

    /// Pay out an escrow: `amount` to `recipient`, safety deposit to the caller.
    fn settle(&self, escrow: &mut SimEscrow, recipient: LedgerAddress, caller: &LedgerAddress, status: EscrowStatus) {
        let safety = escrow.immutables.safety_deposit.min(escrow.balance);
        let payout = escrow.balance - safety;
        self.credit(&recipient, payout);
        self.credit(caller, safety);
        escrow.balance = 0;
        escrow.status = status;
    }

    /// Apply a call the way the escrow contracts would. `Err` is a revert.
    fn apply(&self, call: &LedgerCall, now: u64) -> Result<(), String> {
        let has_access = self.access_holders.read().contains(&call.caller);
        match &call.action {
            EscrowAction::Create {
                role,
                address,
                immutables,
                deposit,
            } => {
                decode_call(&call.payload, &call.action, immutables)?;
                let mut escrows = self.escrows.write();
                if escrows.contains_key(address) {
                    return Err(format!("escrow already exists at {address}"));
                }
                let needed = immutables.safety_deposit.saturating_add(if immutables.token.is_native() {
                    immutables.amount
                } else {
                    0
                });
                if *deposit < needed {
                    return Err(format!("insufficient deposit: {deposit} < {needed}"));
                }
                escrows.insert(
                    address.clone(),
                    SimEscrow {
                        role: *role,
                        immutables: immutables.clone(),
                        status: EscrowStatus::Active,
                        balance: needed,
                    },
                );
                Ok(())
            }
            EscrowAction::Withdraw { address, secret } => {
                let mut escrows = self.escrows.write();
                let escrow = escrows.get_mut(address).ok_or("escrow not found")?;
                let preimage = decode_call(&call.payload, &call.action, &escrow.immutables)?
                    .ok_or("withdrawal carries no secret")?;
                if preimage != secret.as_bytes() {
                    return Err("payload secret does not match action".to_string());
                }
                if escrow.status != EscrowStatus::Active {
                    return Err(format!("escrow is {:?}", escrow.status));
                }
                if !verify(&preimage, &escrow.immutables.hashlock) {
                    return Err("invalid secret".to_string());
                }
                let caller = escrow.immutables.caller(&call.caller, has_access);
                escrow
                    .immutables
                    .timelocks
                    .check_withdraw(now, caller)
                    .map_err(|e| e.to_string())?;
                let recipient = escrow.immutables.withdrawal_recipient(escrow.role).clone();
                self.settle(escrow, recipient, &call.caller, EscrowStatus::Withdrawn);
                Ok(())
            }
            EscrowAction::Cancel { address } => {
                let mut escrows = self.escrows.write();
                let escrow = escrows.get_mut(address).ok_or("escrow not found")?;
                decode_call(&call.payload, &call.action, &escrow.immutables)?;
                if escrow.status != EscrowStatus::Active {
                    return Err(format!("escrow is {:?}", escrow.status));
                }
                let caller = escrow.immutables.caller(&call.caller, has_access);
                escrow
                    .immutables
                    .timelocks
                    .check_cancel(now, caller)
                    .map_err(|e| e.to_string())?;
                let recipient = escrow.immutables.refund_recipient(escrow.role).clone();
                self.settle(escrow, recipient, &call.caller, EscrowStatus::Cancelled);
                Ok(())
            }
            EscrowAction::Rescue { address } => {
                let mut escrows = self.escrows.write();
                let escrow = escrows.get_mut(address).ok_or("escrow not found")?;
                decode_call(&call.payload, &call.action, &escrow.immutables)?;
                let caller = escrow.immutables.caller(&call.caller, has_access);
                escrow
                    .immutables
                    .timelocks
                    .check_rescue(now, caller)
                    .map_err(|e| e.to_string())?;
                let taker = escrow.immutables.taker.clone();
                let amount = escrow.balance;
                self.credit(&taker, amount);
                escrow.balance = 0;
                escrow.status = EscrowStatus::Rescued;
                Ok(())
            }
        }
    }

    fn payload_matches_kind(&self, payload: &WirePayload) -> bool {
        matches!(
            (self.ledger.kind(), payload),
            (LedgerKind::Evm, WirePayload::Evm { .. }) | (LedgerKind::Near, WirePayload::Near { .. })
        )
    }
}

#[async_trait]
impl LedgerTransport for SimulatedLedger {
    async fn submit(&self, call: LedgerCall) -> Result<TxRef, ChainCallError> {
        let (revert, withhold) = {
            let mut faults = self.faults.lock();
            if faults.rate_limited {
                return Err(ChainCallError::new(
                    self.ledger,
                    call.operation,
                    ChainCallKind::RateLimited,
                    "429 too many requests",
                ));
            }
            (faults.revert_next.take(), faults.withhold_receipts)
        };
        if !self.payload_matches_kind(&call.payload) {
            return Err(ChainCallError::new(
                self.ledger,
                call.operation,
                ChainCallKind::InvalidState,
                "payload encoding does not match ledger",
            ));
        }

        let now = self.clock.now();
        let tx = TxRef {
            ledger: self.ledger,
            hash: self.next_tx_hash(),
        };
        let outcome = match revert {
            Some(reason) => Err(reason),
            None => self.apply(&call, now),
        };
        if let Err(reason) = &outcome {
            warn!(ledger = %self.ledger, operation = %call.operation, "[sim] Call reverted: {}", reason);
        } else {
            debug!(ledger = %self.ledger, operation = %call.operation, tx = %tx.hash, "[sim] Call executed");
        }
        self.submitted.write().push(call);

        if !withhold {
            self.receipts.write().insert(
                tx.hash.clone(),
                Receipt {
                    tx: tx.clone(),
                    success: outcome.is_ok(),
                    revert_reason: outcome.err(),
                    block_time: now,
                },
            );
        }
        Ok(tx)
    }

    async fn receipt(&self, tx: &TxRef) -> Result<Option<Receipt>, ChainCallError> {
        Ok(self.receipts.read().get(&tx.hash).cloned())
    }

    async fn escrow_status(&self, address: &LedgerAddress) -> Result<Option<EscrowStatus>, ChainCallError> {
        Ok(self.escrows.read().get(address).map(|e| e.status))
    }

    fn now(&self) -> u64 {
        self.clock.now()
    }
}
