//! Shared escrow adapter machinery.
//!
//! Both ledger adapters apply the same pre-submission checks (hashlock,
//! timelock window, caller role, deposit) and the same submit-then-poll
//! confirmation loop; only the wire encoding differs.

use crate::algorithms::verify;
use crate::domain::{
    AccessError, ChainCallError, ChainCallKind, EscrowImmutables, EscrowOperation, EscrowRef,
    EscrowRole, EscrowStatus, LedgerAddress, LedgerId, SecureSecret,
};
use crate::ports::{EscrowAction, LedgerCall, LedgerTransport, Receipt, WirePayload};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Transport, identity and timing shared by the escrow adapters.
pub(crate) struct AdapterCore {
    pub ledger: LedgerId,
    pub resolver: LedgerAddress,
    pub has_access_token: bool,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub transport: Arc<dyn LedgerTransport>,
}

impl AdapterCore {
    pub fn error(&self, operation: EscrowOperation, kind: ChainCallKind, detail: impl Into<String>) -> ChainCallError {
        ChainCallError::new(self.ledger, operation, kind, detail)
    }

    fn access_denied(&self, operation: EscrowOperation, err: AccessError) -> ChainCallError {
        self.error(operation, ChainCallKind::InvalidState, err.to_string())
    }

    fn check_ledger(&self, operation: EscrowOperation, escrow: &EscrowRef) -> Result<(), ChainCallError> {
        if escrow.ledger != self.ledger {
            return Err(self.error(
                operation,
                ChainCallKind::InvalidState,
                format!("escrow {} lives on {}", escrow.address, escrow.ledger),
            ));
        }
        Ok(())
    }

    /// Creation preconditions: the adapter must be the taker and the deposit
    /// must cover the requirement.
    pub fn check_create(
        &self,
        operation: EscrowOperation,
        immutables: &EscrowImmutables,
        deposit: u128,
        required: u128,
    ) -> Result<(), ChainCallError> {
        if immutables.taker != self.resolver {
            return Err(self.error(
                operation,
                ChainCallKind::InvalidState,
                format!("taker {} is not the resolver {}", immutables.taker, self.resolver),
            ));
        }
        if deposit < required {
            return Err(self.error(
                operation,
                ChainCallKind::InsufficientFunds,
                format!("deposit {deposit} below required {required}"),
            ));
        }
        Ok(())
    }

    pub fn check_withdraw(&self, escrow: &EscrowRef, secret: &SecureSecret) -> Result<(), ChainCallError> {
        let op = EscrowOperation::Withdraw;
        self.check_ledger(op, escrow)?;
        if !verify(secret.as_bytes(), &escrow.immutables.hashlock) {
            return Err(self.error(op, ChainCallKind::InvalidState, "secret does not match hashlock"));
        }
        let caller = escrow.immutables.caller(&self.resolver, self.has_access_token);
        escrow
            .immutables
            .timelocks
            .check_withdraw(self.transport.now(), caller)
            .map_err(|e| self.access_denied(op, e))
    }

    pub fn check_cancel(&self, escrow: &EscrowRef) -> Result<(), ChainCallError> {
        let op = EscrowOperation::Cancel;
        self.check_ledger(op, escrow)?;
        let caller = escrow.immutables.caller(&self.resolver, self.has_access_token);
        escrow
            .immutables
            .timelocks
            .check_cancel(self.transport.now(), caller)
            .map_err(|e| self.access_denied(op, e))
    }

    pub fn check_rescue(&self, escrow: &EscrowRef) -> Result<(), ChainCallError> {
        let op = EscrowOperation::Rescue;
        self.check_ledger(op, escrow)?;
        let caller = escrow.immutables.caller(&self.resolver, self.has_access_token);
        escrow
            .immutables
            .timelocks
            .check_rescue(self.transport.now(), caller)
            .map_err(|e| self.access_denied(op, e))
    }

    /// Submit a call and wait for its receipt.
    ///
    /// Receipt query errors are logged and polling continues; only the
    /// confirmation timeout ends the wait without a receipt.
    pub async fn execute(
        &self,
        operation: EscrowOperation,
        action: EscrowAction,
        payload: WirePayload,
    ) -> Result<Receipt, ChainCallError> {
        let call = LedgerCall {
            ledger: self.ledger,
            operation,
            caller: self.resolver.clone(),
            action,
            payload,
        };
        let tx = self.transport.submit(call).await?;
        debug!(ledger = %self.ledger, %operation, tx = %tx.hash, "[swap] Submitted, awaiting receipt");

        let wait = async {
            loop {
                match self.transport.receipt(&tx).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => warn!(ledger = %self.ledger, tx = %tx.hash, "[swap] Receipt query failed: {}", e),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(self.confirmation_timeout, wait)
            .await
            .map_err(|_| {
                ChainCallError::timeout(
                    self.ledger,
                    operation,
                    format!("no receipt for {} within {:?}", tx.hash, self.confirmation_timeout),
                )
            })?;

        if !receipt.success {
            return Err(self.error(
                operation,
                ChainCallKind::Reverted,
                receipt
                    .revert_reason
                    .clone()
                    .unwrap_or_else(|| "execution reverted".to_string()),
            ));
        }
        debug!(ledger = %self.ledger, %operation, tx = %receipt.tx.hash, "[swap] Confirmed");
        Ok(receipt)
    }

    pub async fn status(&self, escrow: &EscrowRef) -> Result<EscrowStatus, ChainCallError> {
        let op = EscrowOperation::Status;
        self.check_ledger(op, escrow)?;
        self.transport
            .escrow_status(&escrow.address)
            .await?
            .ok_or_else(|| self.error(op, ChainCallKind::InvalidState, format!("no escrow at {}", escrow.address)))
    }

    pub fn escrow_ref(
        &self,
        role: EscrowRole,
        address: LedgerAddress,
        immutables: EscrowImmutables,
        receipt: Receipt,
    ) -> EscrowRef {
        EscrowRef {
            ledger: self.ledger,
            role,
            address,
            immutables,
            creation_tx: receipt.tx,
        }
    }
}

pub(crate) fn create_operation(role: EscrowRole) -> EscrowOperation {
    match role {
        EscrowRole::Source => EscrowOperation::CreateSource,
        EscrowRole::Destination => EscrowOperation::CreateDestination,
    }
}
