//! # Swap Coordinator
//!
//! Drives a swap order through its legs:
//!
//! ```text
//! create ─▶ run_first_leg ─▶ run_second_leg ─▶ complete
//!   │            │                 │              │
//!   │     source escrow     destination escrow   withdraw destination,
//!   │                                            then source
//!   └────────────── cancel (from Created / *LegCompleted) ──────────────
//! ```
//!
//! Every operation takes the per-id lock for its whole duration, validates
//! the current state, and persists and publishes each transition. Adapter
//! failures during a leg move the order to `Failed`; nothing is retried
//! automatically.

use crate::algorithms::{
    compute_hashlock, compute_order_hash, generate_secret_with_len, plan_schedules,
};
use crate::config::{CoordinatorConfig, LedgerLimits};
use crate::domain::{
    invariant_cross_escrow_windows, invariant_secret_matches, ChainCallError, EscrowImmutables,
    EscrowOperation, EscrowRef, EscrowRole, EscrowStatus, FailureDetail, InvariantViolation,
    LedgerAddress, LedgerId, NewSwapOrder, PartialFailure, PartialFailureKind, SecureSecret,
    SwapError, SwapEvent, SwapId, SwapOrder, SwapRequest, SwapStatus, TimelockStage, Timelocks,
    TokenRef, TxRef, ValidationError,
};
use crate::ports::{Clock, EscrowPort, SwapCoordinatorApi, SwapEventPublisher, SwapRepository};
use crate::service::{LedgerExecutor, SwapLockRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Maximum slippage tolerance (100%).
pub const MAX_SLIPPAGE_BPS: u32 = 10_000;

struct LedgerHandle {
    port: Arc<dyn EscrowPort>,
    limits: LedgerLimits,
}

struct ValidatedRequest {
    maker: LedgerAddress,
    recipient: LedgerAddress,
    source_token: TokenRef,
    destination_token: TokenRef,
}

/// Cross-ledger swap coordinator.
pub struct SwapCoordinator {
    config: CoordinatorConfig,
    ledgers: HashMap<LedgerId, LedgerHandle>,
    executor: LedgerExecutor,
    locks: SwapLockRegistry,
    repository: Arc<dyn SwapRepository>,
    publisher: Arc<dyn SwapEventPublisher>,
    clock: Arc<dyn Clock>,
}

impl SwapCoordinator {
    /// Create a coordinator with no ledgers registered.
    pub fn new(
        config: CoordinatorConfig,
        repository: Arc<dyn SwapRepository>,
        publisher: Arc<dyn SwapEventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            ledgers: HashMap::new(),
            executor: LedgerExecutor::new(),
            locks: SwapLockRegistry::new(),
            repository,
            publisher,
            clock,
        }
    }

    /// Register the escrow adapter of a ledger.
    pub fn with_ledger(mut self, port: Arc<dyn EscrowPort>, limits: LedgerLimits) -> Self {
        let ledger = port.ledger();
        self.executor.register(ledger, limits);
        self.ledgers.insert(ledger, LedgerHandle { port, limits });
        self
    }

    /// Coordinator settings.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Registered ledgers, sorted.
    pub fn ledgers(&self) -> Vec<LedgerId> {
        let mut ledgers: Vec<_> = self.ledgers.keys().copied().collect();
        ledgers.sort();
        ledgers
    }

    // ------------------------------------------------------------------
    // Operations with an explicit adapter call timeout
    // ------------------------------------------------------------------

    /// Create the source escrow.
    pub async fn run_first_leg_with_timeout(&self, id: SwapId, timeout: Duration) -> Result<SwapOrder, SwapError> {
        let _guard = self.locks.acquire(id).await;
        let mut order = self.load(id).await?;
        require_status(&order, SwapStatus::Created, "run_first_leg")?;

        let handle = self.handle(order.source_ledger)?;
        let immutables = EscrowImmutables {
            order_hash: order.order_hash,
            hashlock: order.hashlock,
            maker: order.maker_address.clone(),
            taker: handle.port.resolver_address().clone(),
            token: order.source_token.clone(),
            amount: order.amount,
            safety_deposit: handle.limits.safety_deposit,
            timelocks: Timelocks::new(self.clock.now(), order.source_schedule),
        };
        self.create_escrow(&mut order, EscrowRole::Source, immutables, timeout)
            .await?;
        Ok(order)
    }

    /// Create the destination escrow.
    ///
    /// Checks the cross-escrow invariant against the actual source deployment
    /// first; a violation leaves the order in `FirstLegCompleted` so the
    /// operator can cancel.
    pub async fn run_second_leg_with_timeout(&self, id: SwapId, timeout: Duration) -> Result<SwapOrder, SwapError> {
        let _guard = self.locks.acquire(id).await;
        let mut order = self.load(id).await?;
        require_status(&order, SwapStatus::FirstLegCompleted, "run_second_leg")?;

        let source = self.escrow_of(&order, EscrowRole::Source)?;
        let timelocks = Timelocks::new(self.clock.now(), order.destination_schedule);
        invariant_cross_escrow_windows(
            &source.immutables.timelocks,
            &timelocks,
            self.config.min_window_margin_secs,
        )
        .map_err(|e| self.invariant(id, e))?;

        let handle = self.handle(order.destination_ledger)?;
        let immutables = EscrowImmutables {
            order_hash: order.order_hash,
            hashlock: order.hashlock,
            maker: order.recipient_address.clone(),
            taker: handle.port.resolver_address().clone(),
            token: order.destination_token.clone(),
            amount: order.destination_amount,
            safety_deposit: handle.limits.safety_deposit,
            timelocks,
        };
        self.create_escrow(&mut order, EscrowRole::Destination, immutables, timeout)
            .await?;
        Ok(order)
    }

    /// Reveal the secret: withdraw the destination escrow, then the source.
    pub async fn complete_with_timeout(
        &self,
        id: SwapId,
        secret: SecureSecret,
        timeout: Duration,
    ) -> Result<SwapOrder, SwapError> {
        let _guard = self.locks.acquire(id).await;
        let mut order = self.load(id).await?;
        require_status(&order, SwapStatus::SecondLegCompleted, "complete")?;
        invariant_secret_matches(secret.as_bytes(), &order.hashlock).map_err(|e| self.invariant(id, e))?;

        let source = self.escrow_of(&order, EscrowRole::Source)?;
        let destination = self.escrow_of(&order, EscrowRole::Destination)?;
        let now = self.clock.now();
        require_withdrawal_window(&destination, now)?;
        require_withdrawal_window(&source, now)?;
        let destination_port = self.handle(destination.ledger)?.port.clone();
        let source_port = self.handle(source.ledger)?.port.clone();

        self.transition(&mut order, SwapStatus::Completing).await?;

        let dst_result = self
            .withdraw(id, destination_port, destination.clone(), secret.clone(), timeout)
            .await;
        let dst_tx = match dst_result {
            Ok(tx) => tx,
            Err(err) => {
                warn!(swap_id = %id, "[swap] Destination withdrawal failed: {}", err);
                self.fail(&mut order, FailureDetail::from_call(&err), err.to_string())
                    .await?;
                return Err(err.into());
            }
        };
        info!(swap_id = %id, tx = %dst_tx, "[swap] Destination withdrawn, secret revealed");

        match self.withdraw(id, source_port, source, secret, timeout).await {
            Ok(src_tx) => {
                info!(swap_id = %id, tx = %src_tx, "[swap] Source withdrawn");
                self.transition(&mut order, SwapStatus::Completed).await?;
                self.publisher
                    .publish(SwapEvent::SwapCompleted { swap_id: id })
                    .await;
                Ok(order)
            }
            Err(err) => {
                error!(
                    swap_id = %id,
                    "[swap] Secret revealed but source withdrawal failed: {}", err
                );
                let partial = PartialFailure {
                    swap_id: id,
                    kind: PartialFailureKind::SourceWithdrawal,
                    cause: err,
                };
                self.fail(
                    &mut order,
                    FailureDetail::source_withdrawal_failed(&partial.cause),
                    partial.to_string(),
                )
                .await?;
                Err(partial.into())
            }
        }
    }

    /// Cancel every existing escrow, destination first.
    pub async fn cancel_with_timeout(&self, id: SwapId, timeout: Duration) -> Result<SwapOrder, SwapError> {
        let _guard = self.locks.acquire(id).await;
        let mut order = self.load(id).await?;
        if !order.status.is_cancellable() {
            return Err(ValidationError::WrongState {
                operation: "cancel",
                status: order.status,
            }
            .into());
        }

        let now = self.clock.now();
        let mut targets = Vec::new();
        for role in [EscrowRole::Destination, EscrowRole::Source] {
            if let Some(escrow) = order.escrow(role) {
                let opens_at = escrow.immutables.timelocks.stage_time(TimelockStage::Cancellation);
                if now < opens_at {
                    return Err(ValidationError::WindowNotOpen {
                        ledger: escrow.ledger,
                        window: "cancellation",
                        opens_at,
                        now,
                    }
                    .into());
                }
                targets.push((self.handle(escrow.ledger)?.port.clone(), escrow.clone()));
            }
        }

        self.transition(&mut order, SwapStatus::Cancelling).await?;

        let mut first_failure = None;
        for (port, escrow) in targets {
            let ledger = escrow.ledger;
            let result = self
                .executor
                .run(ledger, id, EscrowOperation::Cancel, timeout, move || async move {
                    port.cancel(&escrow).await
                })
                .await;
            match result {
                Ok(tx) => info!(swap_id = %id, %ledger, tx = %tx, "[swap] Escrow cancelled"),
                Err(err) => {
                    warn!(swap_id = %id, %ledger, "[swap] Escrow cancellation failed: {}", err);
                    if first_failure.is_none() {
                        first_failure = Some(err);
                    }
                }
            }
        }

        match first_failure {
            None => {
                self.transition(&mut order, SwapStatus::Cancelled).await?;
                self.publisher
                    .publish(SwapEvent::SwapCancelled { swap_id: id })
                    .await;
                Ok(order)
            }
            Some(err) => {
                error!(swap_id = %id, "[swap] Partial cancellation: {}", err);
                let partial = PartialFailure {
                    swap_id: id,
                    kind: PartialFailureKind::Cancellation,
                    cause: err,
                };
                self.fail(
                    &mut order,
                    FailureDetail::cancellation_failed(&partial.cause),
                    partial.to_string(),
                )
                .await?;
                Err(partial.into())
            }
        }
    }

    /// Operator hook: retry the source withdrawal of a swap whose destination
    /// was already withdrawn. The order record stays as it is; the outcome is
    /// published as `RecoveryAttempted`.
    pub async fn recover_partial_failure_with_timeout(
        &self,
        id: SwapId,
        timeout: Duration,
    ) -> Result<TxRef, SwapError> {
        let _guard = self.locks.acquire(id).await;
        let order = self.load(id).await?;
        if !order.is_recoverable() {
            return Err(ValidationError::NotRecoverable(id).into());
        }
        let source = self.escrow_of(&order, EscrowRole::Source)?;
        require_withdrawal_window(&source, self.clock.now())?;
        let port = self.handle(source.ledger)?.port.clone();

        info!(swap_id = %id, "[swap] Operator recovery of source withdrawal");
        let result = self
            .withdraw(id, port, source, order.secret.clone(), timeout)
            .await;
        let (success, detail) = match &result {
            Ok(tx) => (true, tx.to_string()),
            Err(err) => (false, err.to_string()),
        };
        if success {
            info!(swap_id = %id, tx = %detail, "[swap] Recovery succeeded");
        } else {
            warn!(swap_id = %id, "[swap] Recovery failed: {}", detail);
        }
        self.publisher
            .publish(SwapEvent::RecoveryAttempted {
                swap_id: id,
                success,
                detail,
            })
            .await;
        result.map_err(SwapError::from)
    }

    /// On-ledger status of each existing escrow of an order.
    pub async fn escrow_statuses(&self, id: SwapId) -> Result<Vec<(EscrowRole, EscrowStatus)>, SwapError> {
        let order = self.load(id).await?;
        let mut statuses = Vec::new();
        for role in [EscrowRole::Source, EscrowRole::Destination] {
            if let Some(escrow) = order.escrow(role).cloned() {
                let port = self.handle(escrow.ledger)?.port.clone();
                let status = self
                    .executor
                    .run(escrow.ledger, id, EscrowOperation::Status, self.config.call_timeout(), move || async move {
                        port.status(&escrow).await
                    })
                    .await?;
                statuses.push((role, status));
            }
        }
        Ok(statuses)
    }

    /// Remove a terminal order from storage. Recoverable failures are kept.
    pub async fn purge(&self, id: SwapId) -> Result<bool, SwapError> {
        let _guard = self.locks.acquire(id).await;
        let order = self.load(id).await?;
        if !order.status.is_terminal() || order.is_recoverable() {
            return Err(ValidationError::WrongState {
                operation: "purge",
                status: order.status,
            }
            .into());
        }
        Ok(self.repository.delete(&id).await?)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn validate_request(&self, request: &SwapRequest) -> Result<ValidatedRequest, ValidationError> {
        let source = request.source_ledger;
        let destination = request.destination_ledger;
        if source == destination {
            return Err(ValidationError::SameLedger(source));
        }
        for ledger in [source, destination] {
            if !self.ledgers.contains_key(&ledger) {
                return Err(ValidationError::UnknownLedger(ledger));
            }
        }
        if request.amount == 0 {
            return Err(ValidationError::ZeroAmount { field: "amount" });
        }
        if request.destination_amount == 0 {
            return Err(ValidationError::ZeroAmount {
                field: "destination_amount",
            });
        }
        if request.slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(ValidationError::InvalidSlippage(request.slippage_bps));
        }

        let address = |ledger: LedgerId, raw: &str| {
            LedgerAddress::parse(ledger.kind(), raw).ok_or_else(|| ValidationError::InvalidAddress {
                ledger,
                address: raw.to_string(),
            })
        };
        let token = |ledger: LedgerId, raw: &str| {
            TokenRef::parse(ledger, raw).ok_or_else(|| ValidationError::InvalidToken {
                ledger,
                token: raw.to_string(),
            })
        };
        Ok(ValidatedRequest {
            maker: address(source, &request.user_address)?,
            recipient: address(destination, &request.recipient_address)?,
            source_token: token(source, &request.source_token)?,
            destination_token: token(destination, &request.destination_token)?,
        })
    }

    fn handle(&self, ledger: LedgerId) -> Result<&LedgerHandle, ValidationError> {
        self.ledgers
            .get(&ledger)
            .ok_or(ValidationError::UnknownLedger(ledger))
    }

    async fn load(&self, id: SwapId) -> Result<SwapOrder, SwapError> {
        self.repository
            .get(&id)
            .await?
            .ok_or_else(|| ValidationError::SwapNotFound(id).into())
    }

    fn escrow_of(&self, order: &SwapOrder, role: EscrowRole) -> Result<EscrowRef, SwapError> {
        order.escrow(role).cloned().ok_or_else(|| {
            let name = match role {
                EscrowRole::Source => "source",
                EscrowRole::Destination => "destination",
            };
            self.invariant(
                order.id,
                InvariantViolation::MissingEscrow {
                    swap_id: order.id,
                    role: name,
                },
            )
        })
    }

    fn invariant(&self, id: SwapId, violation: InvariantViolation) -> SwapError {
        error!(swap_id = %id, "[swap] Invariant violation: {}", violation);
        SwapError::Invariant(violation)
    }

    async fn transition(&self, order: &mut SwapOrder, next: SwapStatus) -> Result<(), SwapError> {
        let from = order.status;
        order
            .transition_to(next, self.clock.now())
            .map_err(|e| self.invariant(order.id, e))?;
        self.repository.put(order.clone()).await?;
        info!(swap_id = %order.id, %from, to = %next, "[swap] Status changed");
        self.publisher
            .publish(SwapEvent::SwapStatusChanged {
                swap_id: order.id,
                from,
                to: next,
            })
            .await;
        Ok(())
    }

    async fn fail(&self, order: &mut SwapOrder, detail: FailureDetail, message: String) -> Result<(), SwapError> {
        let from = order.status;
        let recoverable = detail.partial_failure_recoverable;
        order
            .fail(detail, self.clock.now())
            .map_err(|e| self.invariant(order.id, e))?;
        self.repository.put(order.clone()).await?;
        warn!(swap_id = %order.id, %from, "[swap] Swap failed: {}", message);
        self.publisher
            .publish(SwapEvent::SwapStatusChanged {
                swap_id: order.id,
                from,
                to: SwapStatus::Failed,
            })
            .await;
        self.publisher
            .publish(SwapEvent::Error {
                swap_id: order.id,
                message,
                recoverable,
            })
            .await;
        Ok(())
    }

    async fn create_escrow(
        &self,
        order: &mut SwapOrder,
        role: EscrowRole,
        immutables: EscrowImmutables,
        timeout: Duration,
    ) -> Result<(), SwapError> {
        let (ledger, pending, completed, operation) = match role {
            EscrowRole::Source => (
                order.source_ledger,
                SwapStatus::FirstLegPending,
                SwapStatus::FirstLegCompleted,
                EscrowOperation::CreateSource,
            ),
            EscrowRole::Destination => (
                order.destination_ledger,
                SwapStatus::SecondLegPending,
                SwapStatus::SecondLegCompleted,
                EscrowOperation::CreateDestination,
            ),
        };
        let port = self.handle(ledger)?.port.clone();
        let deposit = port.required_deposit(&immutables);

        self.transition(order, pending).await?;
        let result = self
            .executor
            .run(ledger, order.id, operation, timeout, move || async move {
                match role {
                    EscrowRole::Source => port.create_source(immutables, deposit).await,
                    EscrowRole::Destination => port.create_destination(immutables, deposit).await,
                }
            })
            .await;

        match result {
            Ok(escrow) => {
                info!(
                    swap_id = %order.id,
                    %ledger,
                    escrow = %escrow.address,
                    tx = %escrow.creation_tx,
                    "[swap] {:?} escrow created", role
                );
                match role {
                    EscrowRole::Source => order.source_escrow = Some(escrow),
                    EscrowRole::Destination => order.destination_escrow = Some(escrow),
                }
                self.transition(order, completed).await
            }
            Err(err) => {
                warn!(swap_id = %order.id, %ledger, "[swap] {:?} escrow creation failed: {}", role, err);
                self.fail(order, FailureDetail::from_call(&err), err.to_string())
                    .await?;
                Err(err.into())
            }
        }
    }

    async fn withdraw(
        &self,
        id: SwapId,
        port: Arc<dyn EscrowPort>,
        escrow: EscrowRef,
        secret: SecureSecret,
        timeout: Duration,
    ) -> Result<TxRef, ChainCallError> {
        self.executor
            .run(escrow.ledger, id, EscrowOperation::Withdraw, timeout, move || async move {
                port.withdraw(&escrow, &secret).await
            })
            .await
    }
}

fn require_status(order: &SwapOrder, expected: SwapStatus, operation: &'static str) -> Result<(), ValidationError> {
    if order.status != expected {
        return Err(ValidationError::WrongState {
            operation,
            status: order.status,
        });
    }
    Ok(())
}

fn require_withdrawal_window(escrow: &EscrowRef, now: u64) -> Result<(), ValidationError> {
    let timelocks = &escrow.immutables.timelocks;
    if timelocks.withdrawal_open(now) {
        return Ok(());
    }
    let opens_at = timelocks.stage_time(TimelockStage::PrivateWithdrawal);
    if now < opens_at {
        return Err(ValidationError::WindowNotOpen {
            ledger: escrow.ledger,
            window: "withdrawal",
            opens_at,
            now,
        });
    }
    Err(ValidationError::WindowClosed {
        ledger: escrow.ledger,
        window: "withdrawal",
        closed_at: timelocks.stage_time(TimelockStage::Cancellation),
        now,
    })
}

#[async_trait]
impl SwapCoordinatorApi for SwapCoordinator {
    async fn create(&self, request: SwapRequest) -> Result<SwapOrder, SwapError> {
        let validated = self.validate_request(&request)?;
        let schedules = plan_schedules(&self.config, request.source_ledger, request.destination_ledger)
            .map_err(|e| {
                error!("[swap] Schedule planning failed: {}", e);
                SwapError::Invariant(e)
            })?;

        let secret = generate_secret_with_len(self.config.secret_len)?;
        let hashlock = compute_hashlock(secret.as_bytes());
        let id = SwapId::new();
        let order_hash = compute_order_hash(
            &id,
            &hashlock,
            request.source_ledger,
            request.destination_ledger,
            request.amount,
            request.destination_amount,
        );

        let order = SwapOrder::new(NewSwapOrder {
            id,
            source_ledger: request.source_ledger,
            destination_ledger: request.destination_ledger,
            source_token: validated.source_token,
            destination_token: validated.destination_token,
            amount: request.amount,
            destination_amount: request.destination_amount,
            maker_address: validated.maker,
            recipient_address: validated.recipient,
            slippage_bps: request.slippage_bps,
            order_hash,
            secret,
            hashlock,
            source_schedule: schedules.source,
            destination_schedule: schedules.destination,
            created_at: self.clock.now(),
        });
        self.repository.put(order.clone()).await?;

        info!(
            swap_id = %id,
            source = %order.source_ledger,
            destination = %order.destination_ledger,
            amount = %order.amount,
            "[swap] Swap created, hashlock {:02x}{:02x}...",
            hashlock[0], hashlock[1]
        );
        self.publisher.publish(SwapEvent::created(&order)).await;
        Ok(order)
    }

    async fn run_first_leg(&self, id: SwapId) -> Result<SwapOrder, SwapError> {
        self.run_first_leg_with_timeout(id, self.config.call_timeout())
            .await
    }

    async fn run_second_leg(&self, id: SwapId) -> Result<SwapOrder, SwapError> {
        self.run_second_leg_with_timeout(id, self.config.call_timeout())
            .await
    }

    async fn complete(&self, id: SwapId, secret: SecureSecret) -> Result<SwapOrder, SwapError> {
        self.complete_with_timeout(id, secret, self.config.call_timeout())
            .await
    }

    async fn cancel(&self, id: SwapId) -> Result<SwapOrder, SwapError> {
        self.cancel_with_timeout(id, self.config.call_timeout()).await
    }

    async fn recover_partial_failure(&self, id: SwapId) -> Result<TxRef, SwapError> {
        self.recover_partial_failure_with_timeout(id, self.config.call_timeout())
            .await
    }

    async fn get(&self, id: SwapId) -> Result<SwapOrder, SwapError> {
        self.load(id).await
    }

    async fn list(&self) -> Result<Vec<SwapOrder>, SwapError> {
        self.repository.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemorySwapRepository, ManualClock, NoOpPublisher};
    use crate::test_utils::{sample_request, MockEscrowPort};

    fn coordinator() -> SwapCoordinator {
        SwapCoordinator::new(
            CoordinatorConfig::default(),
            Arc::new(InMemorySwapRepository::new()),
            Arc::new(NoOpPublisher),
            Arc::new(ManualClock::default()),
        )
        .with_ledger(Arc::new(MockEscrowPort::new(LedgerId::Ethereum)), LedgerLimits::default())
        .with_ledger(Arc::new(MockEscrowPort::new(LedgerId::Near)), LedgerLimits::default())
    }

    fn validation(err: SwapError) -> ValidationError {
        match err {
            SwapError::Validation(v) => v,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_stores_order() {
        let coordinator = coordinator();
        let order = coordinator
            .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
            .await
            .unwrap();
        assert_eq!(order.status, SwapStatus::Created);
        assert_eq!(order.hashlock, compute_hashlock(order.secret.as_bytes()));
        assert_eq!(coordinator.get(order.id).await.unwrap(), order);
        assert_eq!(order.source_schedule.private_withdrawal, 144);
    }

    #[tokio::test]
    async fn test_create_rejects_same_ledger() {
        let err = coordinator()
            .create(sample_request(LedgerId::Near, LedgerId::Near))
            .await
            .unwrap_err();
        assert_eq!(validation(err), ValidationError::SameLedger(LedgerId::Near));
    }

    #[tokio::test]
    async fn test_create_rejects_unregistered_ledger() {
        let err = coordinator()
            .create(sample_request(LedgerId::Polygon, LedgerId::Near))
            .await
            .unwrap_err();
        assert_eq!(validation(err), ValidationError::UnknownLedger(LedgerId::Polygon));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_fields() {
        let coordinator = coordinator();

        let mut request = sample_request(LedgerId::Ethereum, LedgerId::Near);
        request.amount = 0;
        assert_eq!(
            validation(coordinator.create(request).await.unwrap_err()),
            ValidationError::ZeroAmount { field: "amount" }
        );

        let mut request = sample_request(LedgerId::Ethereum, LedgerId::Near);
        request.slippage_bps = 10_001;
        assert_eq!(
            validation(coordinator.create(request).await.unwrap_err()),
            ValidationError::InvalidSlippage(10_001)
        );

        let mut request = sample_request(LedgerId::Ethereum, LedgerId::Near);
        request.recipient_address = "Alice.NEAR".into();
        assert!(matches!(
            validation(coordinator.create(request).await.unwrap_err()),
            ValidationError::InvalidAddress { ledger: LedgerId::Near, .. }
        ));

        let mut request = sample_request(LedgerId::Ethereum, LedgerId::Near);
        request.source_token = "usdc.near".into();
        assert!(matches!(
            validation(coordinator.create(request).await.unwrap_err()),
            ValidationError::InvalidToken { ledger: LedgerId::Ethereum, .. }
        ));

        assert!(coordinator.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let id = SwapId::new();
        let err = coordinator().run_first_leg(id).await.unwrap_err();
        assert_eq!(validation(err), ValidationError::SwapNotFound(id));
    }

    #[tokio::test]
    async fn test_lock_entries_do_not_accumulate() {
        let coordinator = coordinator();
        for _ in 0..1_000 {
            assert!(coordinator.run_first_leg(SwapId::new()).await.is_err());
        }
        assert!(coordinator.locks.is_empty());

        let order = coordinator
            .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
            .await
            .unwrap();
        coordinator.cancel(order.id).await.unwrap();
        assert!(coordinator.cancel(order.id).await.is_err());
        assert!(coordinator.locks.is_empty());
    }

    #[tokio::test]
    async fn test_second_leg_requires_first() {
        let coordinator = coordinator();
        let order = coordinator
            .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
            .await
            .unwrap();
        let err = coordinator.run_second_leg(order.id).await.unwrap_err();
        assert_eq!(
            validation(err),
            ValidationError::WrongState {
                operation: "run_second_leg",
                status: SwapStatus::Created
            }
        );
        assert_eq!(coordinator.get(order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn test_cancel_from_created() {
        let coordinator = coordinator();
        let order = coordinator
            .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
            .await
            .unwrap();
        let cancelled = coordinator.cancel(order.id).await.unwrap();
        assert_eq!(cancelled.status, SwapStatus::Cancelled);
        assert!(coordinator.cancel(order.id).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_terminal_only() {
        let coordinator = coordinator();
        let order = coordinator
            .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
            .await
            .unwrap();
        assert!(coordinator.purge(order.id).await.is_err());
        coordinator.cancel(order.id).await.unwrap();
        assert!(coordinator.purge(order.id).await.unwrap());
        assert!(coordinator.get(order.id).await.is_err());
    }

    #[tokio::test]
    async fn test_recover_requires_partial_failure() {
        let coordinator = coordinator();
        let order = coordinator
            .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
            .await
            .unwrap();
        let err = coordinator.recover_partial_failure(order.id).await.unwrap_err();
        assert_eq!(validation(err), ValidationError::NotRecoverable(order.id));
    }
}
