//! NEAR Escrow Adapter
//!
//! Implements `EscrowPort` for NEAR. Escrows are sub-accounts of the escrow
//! factory named after the order hash; calls are function calls with JSON
//! arguments. Large amounts travel as decimal strings (`U128` convention).
//!
//! The withdrawal secret travels base64-encoded; the escrow decodes it and
//! checks `sha256(bytes)` against the hashlock, the same digest the EVM
//! escrows compute.

use super::escrow_common::{create_operation, AdapterCore};
use crate::algorithms::address::near_escrow_account;
use crate::algorithms::timelock_codec::pack_near_timelocks;
use crate::config::{ConfigError, LedgerConfig, DEFAULT_NEAR_STORAGE_DEPOSIT};
use crate::domain::{
    ChainCallError, ChainCallKind, EscrowImmutables, EscrowOperation, EscrowRef, EscrowRole,
    EscrowStatus, InvariantViolation, LedgerAddress, LedgerId, LedgerKind, SecureSecret, TokenRef,
    TxRef,
};
use crate::ports::{EscrowAction, EscrowPort, LedgerTransport, WirePayload};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Factory method deploying a source escrow.
pub const CREATE_SRC_METHOD: &str = "create_src_escrow";
/// Factory method deploying a destination escrow.
pub const CREATE_DST_METHOD: &str = "create_dst_escrow";
/// Escrow withdrawal method.
pub const WITHDRAW_METHOD: &str = "withdraw";
/// Escrow cancellation method.
pub const CANCEL_METHOD: &str = "cancel";
/// Escrow rescue method.
pub const RESCUE_METHOD: &str = "rescue_funds";

/// `secret` argument of a withdrawal: standard base64 of the preimage.
pub fn encode_secret_arg(secret: &[u8]) -> String {
    STANDARD.encode(secret)
}

/// Preimage carried by a `secret` argument, as the escrow decodes it.
pub fn decode_secret_arg(arg: &str) -> Option<Vec<u8>> {
    STANDARD.decode(arg).ok()
}

/// NEAR adapter settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NearEscrowConfig {
    /// Ledger served.
    pub ledger: LedgerId,
    /// Escrow factory account.
    pub factory: String,
    /// Resolver account.
    pub resolver: String,
    /// Factory creation fee (yoctoNEAR).
    pub creation_fee: u128,
    /// Storage staking for the escrow sub-account (yoctoNEAR).
    pub storage_deposit: u128,
    /// Resolver holds the public access credential.
    pub has_access_token: bool,
    /// Receipt wait limit.
    pub confirmation_timeout: Duration,
    /// Receipt polling interval.
    pub poll_interval: Duration,
}

impl NearEscrowConfig {
    /// Build from a ledger config section.
    pub fn from_ledger_config(config: &LedgerConfig) -> Result<Self, ConfigError> {
        let ledger = config.id;
        if ledger.kind() != LedgerKind::Near {
            return Err(ConfigError::InvalidField {
                ledger,
                field: "id",
                reason: "not a NEAR ledger".into(),
            });
        }
        let account = |field: &'static str, raw: &str| {
            LedgerAddress::parse(LedgerKind::Near, raw)
                .map(|_| raw.to_string())
                .ok_or_else(|| ConfigError::InvalidField {
                    ledger,
                    field,
                    reason: format!("'{raw}' is not a NEAR account id"),
                })
        };
        let near = config.near.clone().unwrap_or_default();
        Ok(Self {
            ledger,
            factory: account("factory", &config.factory)?,
            resolver: account("resolver", &config.resolver)?,
            creation_fee: near.creation_fee,
            storage_deposit: if config.near.is_some() {
                near.storage_deposit
            } else {
                DEFAULT_NEAR_STORAGE_DEPOSIT
            },
            has_access_token: config.has_access_token,
            confirmation_timeout: config.confirmation_timeout(),
            poll_interval: config.poll_interval(),
        })
    }
}

/// Escrow adapter for NEAR.
pub struct NearEscrowAdapter {
    config: NearEscrowConfig,
    core: AdapterCore,
}

fn account_of(address: &LedgerAddress, field: &'static str) -> Result<String, InvariantViolation> {
    address
        .as_near()
        .map(str::to_string)
        .ok_or(InvariantViolation::LedgerMismatch {
            expected: LedgerKind::Near,
            field,
        })
}

/// JSON form of the immutables, as the escrow contracts expect them.
pub fn immutables_json(immutables: &EscrowImmutables) -> Result<Value, InvariantViolation> {
    let token = match &immutables.token {
        TokenRef::Native => Value::Null,
        TokenRef::Contract(address) => Value::String(account_of(address, "token")?),
    };
    let timelocks = pack_near_timelocks(&immutables.timelocks)?;
    Ok(json!({
        "order_hash": hex::encode(immutables.order_hash),
        "hashlock": hex::encode(immutables.hashlock),
        "maker": account_of(&immutables.maker, "maker")?,
        "taker": account_of(&immutables.taker, "taker")?,
        "token": token,
        "amount": immutables.amount.to_string(),
        "safety_deposit": immutables.safety_deposit.to_string(),
        "timelocks": timelocks,
    }))
}

impl NearEscrowAdapter {
    /// Create an adapter over `transport`.
    pub fn new(config: NearEscrowConfig, transport: Arc<dyn LedgerTransport>) -> Self {
        let core = AdapterCore {
            ledger: config.ledger,
            resolver: LedgerAddress::Near(config.resolver.clone()),
            has_access_token: config.has_access_token,
            confirmation_timeout: config.confirmation_timeout,
            poll_interval: config.poll_interval,
            transport,
        };
        Self { config, core }
    }

    fn encoding_error(&self, operation: EscrowOperation, err: InvariantViolation) -> ChainCallError {
        self.core.error(operation, ChainCallKind::InvalidState, err.to_string())
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
        let args = immutables_json(&immutables).map_err(|e| self.encoding_error(op, e))?;
        let address = self
            .compute_address(&immutables, role)
            .map_err(|e| self.encoding_error(op, e))?;
        let method = match role {
            EscrowRole::Source => CREATE_SRC_METHOD,
            EscrowRole::Destination => CREATE_DST_METHOD,
        };

        info!(
            ledger = %self.config.ledger,
            escrow = %address,
            "[swap] Deploying {:?} escrow via {}",
            role, self.config.factory
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
                WirePayload::Near {
                    receiver: self.config.factory.clone(),
                    method: method.to_string(),
                    args_json: json!({ "immutables": args }).to_string(),
                    deposit,
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
        method: &str,
        args: Value,
    ) -> Result<TxRef, ChainCallError> {
        let receiver = escrow
            .address
            .as_near()
            .ok_or_else(|| self.core.error(operation, ChainCallKind::InvalidState, "escrow address is not a NEAR account"))?
            .to_string();
        let receipt = self
            .core
            .execute(
                operation,
                action,
                WirePayload::Near {
                    receiver,
                    method: method.to_string(),
                    args_json: args.to_string(),
                    deposit: 0,
                },
            )
            .await?;
        Ok(receipt.tx)
    }
}

#[async_trait]
impl EscrowPort for NearEscrowAdapter {
    fn ledger(&self) -> LedgerId {
        self.config.ledger
    }

    fn resolver_address(&self) -> &LedgerAddress {
        &self.core.resolver
    }

    /// Creation fee + storage + safety deposit (+ amount for native NEAR).
    fn required_deposit(&self, immutables: &EscrowImmutables) -> u128 {
        let amount = if immutables.token.is_native() {
            immutables.amount
        } else {
            0
        };
        self.config
            .creation_fee
            .saturating_add(self.config.storage_deposit)
            .saturating_add(immutables.safety_deposit)
            .saturating_add(amount)
    }

    fn compute_address(
        &self,
        immutables: &EscrowImmutables,
        role: EscrowRole,
    ) -> Result<LedgerAddress, InvariantViolation> {
        Ok(LedgerAddress::Near(near_escrow_account(
            &immutables.order_hash,
            role,
            &self.config.factory,
        )))
    }

    async fn create_source(&self, immutables: EscrowImmutables, deposit: u128) -> Result<EscrowRef, ChainCallError> {
        self.create(EscrowRole::Source, immutables, deposit).await
    }

    async fn create_destination(&self, immutables: EscrowImmutables, deposit: u128) -> Result<EscrowRef, ChainCallError> {
        self.create(EscrowRole::Destination, immutables, deposit).await
    }

    async fn withdraw(&self, escrow: &EscrowRef, secret: &SecureSecret) -> Result<TxRef, ChainCallError> {
        self.core.check_withdraw(escrow, secret)?;
        let action = EscrowAction::Withdraw {
            address: escrow.address.clone(),
            secret: secret.clone(),
        };
        let args = json!({ "secret": encode_secret_arg(secret.as_bytes()) });
        self.call_escrow(EscrowOperation::Withdraw, escrow, action, WITHDRAW_METHOD, args)
            .await
    }

    async fn cancel(&self, escrow: &EscrowRef) -> Result<TxRef, ChainCallError> {
        self.core.check_cancel(escrow)?;
        let action = EscrowAction::Cancel {
            address: escrow.address.clone(),
        };
        self.call_escrow(EscrowOperation::Cancel, escrow, action, CANCEL_METHOD, json!({}))
            .await
    }

    async fn rescue(&self, escrow: &EscrowRef) -> Result<TxRef, ChainCallError> {
        self.core.check_rescue(escrow)?;
        let action = EscrowAction::Rescue {
            address: escrow.address.clone(),
        };
        let args = json!({ "recipient": self.config.resolver });
        self.call_escrow(EscrowOperation::Rescue, escrow, action, RESCUE_METHOD, args)
            .await
    }

    async fn status(&self, escrow: &EscrowRef) -> Result<EscrowStatus, ChainCallError> {
        self.core.status(escrow).await
    }
}
