//! EVM Escrow Adapter
//!
//! Implements `EscrowPort` for EVM ledgers. Escrows are CREATE2 clones
//! deployed by a factory; calls are ABI-encoded against the fixed escrow
//! interface.

use super::escrow_common::{create_operation, AdapterCore};
use crate::algorithms::address::{evm_escrow_address, immutables_call, withdraw_call};
use crate::config::{ConfigError, LedgerConfig};
use crate::domain::{
    ChainCallError, ChainCallKind, EscrowImmutables, EscrowOperation, EscrowRef, EscrowRole,
    EscrowStatus, Hash, InvariantViolation, LedgerAddress, LedgerId, LedgerKind, SecureSecret,
    TxRef,
};
use crate::ports::{EscrowAction, EscrowPort, LedgerTransport, WirePayload};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// `createSrcEscrow(Immutables)`.
pub const CREATE_SRC_SIGNATURE: &str =
    "createSrcEscrow((bytes32,bytes32,address,address,address,uint256,uint256,uint256))";
/// `createDstEscrow(Immutables)`.
pub const CREATE_DST_SIGNATURE: &str =
    "createDstEscrow((bytes32,bytes32,address,address,address,uint256,uint256,uint256))";
/// `withdraw(bytes secret, Immutables)`.
pub const WITHDRAW_SIGNATURE: &str =
    "withdraw(bytes,(bytes32,bytes32,address,address,address,uint256,uint256,uint256))";
/// `cancel(Immutables)`.
pub const CANCEL_SIGNATURE: &str =
    "cancel((bytes32,bytes32,address,address,address,uint256,uint256,uint256))";
/// `rescue(Immutables)`.
pub const RESCUE_SIGNATURE: &str =
    "rescue((bytes32,bytes32,address,address,address,uint256,uint256,uint256))";

/// EVM adapter settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvmEscrowConfig {
    /// Ledger served.
    pub ledger: LedgerId,
    /// Escrow factory (CREATE2 deployer).
    pub factory: [u8; 20],
    /// Resolver account.
    pub resolver: [u8; 20],
    /// Init code hash of source escrow clones.
    pub src_init_code_hash: Hash,
    /// Init code hash of destination escrow clones.
    pub dst_init_code_hash: Hash,
    /// Resolver holds the public access credential.
    pub has_access_token: bool,
    /// Receipt wait limit.
    pub confirmation_timeout: Duration,
    /// Receipt polling interval.
    pub poll_interval: Duration,
}

impl EvmEscrowConfig {
    /// Build from a ledger config section.
    pub fn from_ledger_config(config: &LedgerConfig) -> Result<Self, ConfigError> {
        let ledger = config.id;
        if ledger.kind() != LedgerKind::Evm {
            return Err(ConfigError::InvalidField {
                ledger,
                field: "id",
                reason: "not an EVM ledger".into(),
            });
        }
        let address = |field: &'static str, raw: &str| {
            LedgerAddress::parse(LedgerKind::Evm, raw)
                .and_then(|a| a.as_evm().copied())
                .ok_or_else(|| ConfigError::InvalidField {
                    ledger,
                    field,
                    reason: format!("'{raw}' is not an EVM address"),
                })
        };
        let hash = |field: &'static str, raw: &str| -> Result<Hash, ConfigError> {
            hex::decode(raw.trim_start_matches("0x"))
                .ok()
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or_else(|| ConfigError::InvalidField {
                    ledger,
                    field,
                    reason: "expected 32 hex bytes".into(),
                })
        };
        let evm = config.evm.as_ref().ok_or_else(|| ConfigError::InvalidField {
            ledger,
            field: "evm",
            reason: "missing [evm] settings".into(),
        })?;

        Ok(Self {
            ledger,
            factory: address("factory", &config.factory)?,
            resolver: address("resolver", &config.resolver)?,
            src_init_code_hash: hash("src_init_code_hash", &evm.src_init_code_hash)?,
            dst_init_code_hash: hash("dst_init_code_hash", &evm.dst_init_code_hash)?,
            has_access_token: config.has_access_token,
            confirmation_timeout: config.confirmation_timeout(),
            poll_interval: config.poll_interval(),
        })
    }
}

/// Escrow adapter for EVM ledgers.
pub struct EvmEscrowAdapter {
    config: EvmEscrowConfig,
    core: AdapterCore,
}

impl EvmEscrowAdapter {
    /// Create an adapter over `transport`.
    pub fn new(config: EvmEscrowConfig, transport: Arc<dyn LedgerTransport>) -> Self {
        let core = AdapterCore {
            ledger: config.ledger,
            resolver: LedgerAddress::Evm(config.resolver),
            has_access_token: config.has_access_token,
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: config.poll_interval,
            transport,
        };
        Self { config, core }
    }

    fn init_code_hash(&self, role: EscrowRole) -> &Hash {
        match role {
            EscrowRole::Source => &self.config.src_init_code_hash,
            EscrowRole::Destination => &self.config.dst_init_code_hash,
        }
    }

    fn encoding_error(&self, operation: EscrowOperation, err: InvariantViolation) -> ChainCallError {
        self.core.error(operation, ChainCallKind::InvalidState, err.to_string())
    }

    fn escrow_target(&self, operation: EscrowOperation, escrow: &EscrowRef) -> Result<[u8; 20], ChainCallError> {
        escrow
            .address
            .as_evm()
            .copied()
            .ok_or_else(|| self.core.error(operation, ChainCallKind::InvalidState, "escrow address is not an EVM address"))
    }

    async fn create(
        &self,
        role: EscrowRole,
        immutables: EscrowImmutables,
        deposit: u128,
    ) -> Result<EscrowRef, ChainCallError> {
        let op = create_operation(role);
        self.core
            .check_create(op, &immutables, deposit, self.required_deposit(&immutables))?;
        let address = self
            .compute_address(&immutables, role)
            .map_err(|e| self.encoding_error(op, e))?;
        let signature = match role {
            EscrowRole::Source => CREATE_SRC_SIGNATURE,
            EscrowRole::Destination => CREATE_DST_SIGNATURE,
        };
        let calldata = immutables_call(signature, &immutables).map_err(|e| self.encoding_error(op, e))?;

        info!(
            ledger = %self.config.ledger,
            escrow = %address,
            "[swap] Deploying {:?} escrow {:02x}{:02x}...",
            role, immutables.order_hash[0], immutables.order_hash[1]
        );

        let receipt = self
            .core
            .execute(
                op,
                EscrowAction::Create {
                    role,
                    address: address.clone(),
                    immutables: immutables.clone(),
                    deposit,
                },
                WirePayload::Evm {
                    to: self.config.factory,
                    calldata,
                    value: deposit,
                },
            )
            .await?;
        Ok(self.core.escrow_ref(role, address, immutables, receipt))
    }

    async fn call_escrow(
        &self,
        operation: EscrowOperation,
        escrow: &EscrowRef,
        action: EscrowAction,
        calldata: Result<Vec<u8>, InvariantViolation>,
    ) -> Result<TxRef, ChainCallError> {
        let to = self.escrow_target(operation, escrow)?;
        let calldata = calldata.map_err(|e| self.encoding_error(operation, e))?;
        let receipt = self
            .core
            .execute(operation, action, WirePayload::Evm { to, calldata, value: 0 })
            .await?;
        Ok(receipt.tx)
    }
}

#[async_trait]
impl EscrowPort for EvmEscrowAdapter {
    fn ledger(&self) -> LedgerId {
        self.config.ledger
    }

    fn resolver_address(&self) -> &LedgerAddress {
        &self.core.resolver
    }

    /// Safety deposit, plus the amount itself for native-asset escrows.
    fn required_deposit(&self, immutables: &EscrowImmutables) -> u128 {
        let amount = if immutables.token.is_native() {
            immutables.amount
        } else {
            0
        };
        immutables.safety_deposit.saturating_add(amount)
    }

    fn compute_address(
        &self,
        immutables: &EscrowImmutables,
        role: EscrowRole,
    ) -> Result<LedgerAddress, InvariantViolation> {
        evm_escrow_address(&self.config.factory, self.init_code_hash(role), immutables).map(LedgerAddress::Evm)
    }

    async fn create_source(&self, immutables: EscrowImmutables, deposit: u128) -> Result<EscrowRef, ChainCallError> {
        self.create(EscrowRole::Source, immutables, deposit).await
    }

    async fn create_destination(&self, immutables: EscrowImmutables, deposit: u128) -> Result<EscrowRef, ChainCallError> {
        self.create(EscrowRole::Destination, immutables, deposit).await
    }

    async fn withdraw(&self, escrow: &EscrowRef, secret: &SecureSecret) -> Result<TxRef, ChainCallError> {
        self.core.check_withdraw(escrow, secret)?;
        let calldata = withdraw_call(WITHDRAW_SIGNATURE, secret.as_bytes(), &escrow.immutables);
        let action = EscrowAction::Withdraw {
            address: escrow.address.clone(),
            secret: secret.clone(),
        };
        self.call_escrow(EscrowOperation::Withdraw, escrow, action, calldata).await
    }

    async fn cancel(&self, escrow: &EscrowRef) -> Result<TxRef, ChainCallError> {
        self.core.check_cancel(escrow)?;
        let calldata = immutables_call(CANCEL_SIGNATURE, &escrow.immutables);
        let action = EscrowAction::Cancel {
            address: escrow.address.clone(),
        };
        self.call_escrow(EscrowOperation::Cancel, escrow, action, calldata).await
    }

    async fn rescue(&self, escrow: &EscrowRef) -> Result<TxRef, ChainCallError> {
        self.core.check_rescue(escrow)?;
        let calldata = immutables_call(RESCUE_SIGNATURE, &escrow.immutables);
        let action = EscrowAction::Rescue {
            address: escrow.address.clone(),
        };
        self.call_escrow(EscrowOperation::Rescue, escrow, action, calldata).await
    }

    async fn status(&self, escrow: &EscrowRef) -> Result<EscrowStatus, ChainCallError> {
        self.core.status(escrow).await
    }
}
