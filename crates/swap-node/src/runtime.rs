//! # Swap Node Runtime
//!
//! Wires the coordinator to one simulated ledger and escrow adapter per
//! configured ledger, logs every published event, and drives the demo swap.
//!
//! ## Initialization Order
//!
//! 1. Shared infrastructure (clock, event bus, repository)
//! 2. One `SimulatedLedger` + escrow adapter per `[[ledgers]]` section
//! 3. Coordinator with every adapter registered
//!
//! The simulated ledgers share a manually driven clock seeded from wall
//! time, so the demo can step past finality waits instead of sleeping.

use crate::config::{NodeConfig, NodeConfigError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use swap_engine::adapters::{
    BroadcastEventBus, EvmEscrowAdapter, EvmEscrowConfig, InMemorySwapRepository, ManualClock,
    NearEscrowAdapter, NearEscrowConfig, SimulatedLedger, SystemClock,
};
use swap_engine::config::LedgerConfig;
use swap_engine::domain::{LedgerId, LedgerKind, SwapError, SwapEvent, SwapOrder};
use swap_engine::ports::{Clock, EscrowPort, SwapCoordinatorApi};
use swap_engine::service::SwapCoordinator;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Running swap node.
pub struct SwapNode {
    config: NodeConfig,
    clock: Arc<ManualClock>,
    event_bus: Arc<BroadcastEventBus>,
    ledgers: BTreeMap<LedgerId, Arc<SimulatedLedger>>,
    coordinator: Arc<SwapCoordinator>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl SwapNode {
    /// Create a node whose simulated time starts at wall time.
    pub fn new(config: NodeConfig) -> Result<Self, NodeConfigError> {
        let clock = Arc::new(ManualClock::new(SystemClock.now()));
        Self::with_clock(config, clock)
    }

    /// Create a node driven by `clock`.
    pub fn with_clock(config: NodeConfig, clock: Arc<ManualClock>) -> Result<Self, NodeConfigError> {
        info!(ledgers = config.ledgers.len(), "[swap] Creating swap node");

        let event_bus = Arc::new(BroadcastEventBus::new());
        let mut coordinator = SwapCoordinator::new(
            config.coordinator.clone(),
            Arc::new(InMemorySwapRepository::new()),
            event_bus.clone(),
            clock.clone(),
        );

        let mut ledgers = BTreeMap::new();
        for ledger_config in &config.ledgers {
            let ledger = Arc::new(SimulatedLedger::new(ledger_config.id, clock.clone()));
            let port = escrow_port(ledger_config, ledger.clone())?;
            if ledger_config.has_access_token {
                ledger.grant_access(port.resolver_address().clone());
            }
            info!(
                ledger = %ledger_config.id,
                resolver = %port.resolver_address(),
                max_concurrent_calls = ledger_config.limits().max_concurrent_calls,
                "[swap] Ledger registered"
            );
            coordinator = coordinator.with_ledger(port, ledger_config.limits());
            ledgers.insert(ledger_config.id, ledger);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            clock,
            event_bus,
            ledgers,
            coordinator: Arc::new(coordinator),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Start the event logger.
    pub fn start(&self) -> JoinHandle<()> {
        info!("===========================================");
        info!("  Swap Node v{}", swap_engine::VERSION);
        info!("  Ledgers: {:?}", self.coordinator.ledgers());
        info!("===========================================");

        spawn_event_logger(
            self.event_bus.subscribe(),
            self.clock.clone(),
            self.shutdown_rx.clone(),
        )
    }

    /// Run the configured demo swap to completion.
    ///
    /// Advances simulated time past the later of the two private
    /// withdrawal offsets before revealing the secret.
    pub async fn run_demo(&self) -> Result<SwapOrder, SwapError> {
        let request = self.config.demo.request();
        let order = self.coordinator.create(request).await?;
        info!(
            swap_id = %order.id,
            created_at = %format_timestamp(order.created_at),
            "[swap] Demo swap created"
        );

        let order = self.coordinator.run_first_leg(order.id).await?;
        let order = self.coordinator.run_second_leg(order.id).await?;

        let wait = order
            .source_schedule
            .private_withdrawal
            .max(order.destination_schedule.private_withdrawal);
        self.clock.advance(u64::from(wait) + 1);
        info!(
            swap_id = %order.id,
            now = %format_timestamp(self.clock.now()),
            "[swap] Withdrawal windows open"
        );

        let order = self.coordinator.complete(order.id, order.secret.clone()).await?;
        for (role, status) in self.coordinator.escrow_statuses(order.id).await? {
            info!(swap_id = %order.id, ?role, ?status, "[swap] Escrow settled");
        }
        if let Some(ledger) = self.ledgers.get(&order.destination_ledger) {
            info!(
                swap_id = %order.id,
                recipient = %order.recipient_address,
                balance = ledger.balance_of(&order.recipient_address),
                "[swap] Recipient paid"
            );
        }
        Ok(order)
    }

    /// Signal background tasks to stop.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        // Give the logger time to drain
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Shutdown complete");
    }

    /// Node configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Coordinator handle.
    pub fn coordinator(&self) -> Arc<SwapCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Simulated ledger for `id`.
    pub fn ledger(&self, id: LedgerId) -> Option<Arc<SimulatedLedger>> {
        self.ledgers.get(&id).cloned()
    }

    /// Event bus the coordinator publishes to.
    pub fn event_bus(&self) -> Arc<BroadcastEventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Simulated clock.
    pub fn clock(&self) -> Arc<ManualClock> {
        Arc::clone(&self.clock)
    }
}

/// Escrow adapter for the ledger family of `config`.
fn escrow_port(
    config: &LedgerConfig,
    ledger: Arc<SimulatedLedger>,
) -> Result<Arc<dyn EscrowPort>, NodeConfigError> {
    let port: Arc<dyn EscrowPort> = match config.id.kind() {
        LedgerKind::Evm => Arc::new(EvmEscrowAdapter::new(
            EvmEscrowConfig::from_ledger_config(config)?,
            ledger,
        )),
        LedgerKind::Near => Arc::new(NearEscrowAdapter::new(
            NearEscrowConfig::from_ledger_config(config)?,
            ledger,
        )),
    };
    Ok(port)
}

fn spawn_event_logger(
    mut events: broadcast::Receiver<SwapEvent>,
    clock: Arc<ManualClock>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        info!(at = %format_timestamp(clock.now()), "[swap] {}", describe(&event));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "[swap] Event logger lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.changed() => break,
            }
        }
    })
}

/// One-line description of an event.
pub fn describe(event: &SwapEvent) -> String {
    match event {
        SwapEvent::SwapCreated {
            swap_id,
            source_ledger,
            destination_ledger,
            hashlock,
        } => format!("{swap_id} created {source_ledger} -> {destination_ledger} hashlock={hashlock}"),
        SwapEvent::SwapStatusChanged { swap_id, from, to } => format!("{swap_id} {from} -> {to}"),
        SwapEvent::SwapCompleted { swap_id } => format!("{swap_id} completed"),
        SwapEvent::SwapCancelled { swap_id } => format!("{swap_id} cancelled"),
        SwapEvent::Error {
            swap_id,
            message,
            recoverable,
        } => format!("{swap_id} error (recoverable={recoverable}): {message}"),
        SwapEvent::RecoveryAttempted {
            swap_id,
            success,
            detail,
        } => format!("{swap_id} recovery success={success}: {detail}"),
    }
}

/// RFC 3339 rendering of unix seconds.
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_engine::domain::{EscrowRole, EscrowStatus, SwapId, SwapStatus};

    fn node() -> SwapNode {
        SwapNode::with_clock(NodeConfig::default(), Arc::new(ManualClock::default())).unwrap()
    }

    #[test]
    fn test_registers_configured_ledgers() {
        let node = node();
        assert_eq!(
            node.coordinator().ledgers(),
            vec![LedgerId::Ethereum, LedgerId::Near]
        );
        assert!(node.ledger(LedgerId::Near).is_some());
        assert!(node.ledger(LedgerId::Polygon).is_none());
    }

    #[test]
    fn test_evm_ledger_requires_settings() {
        let mut config = NodeConfig::default();
        config.ledgers[0].evm = None;
        let result = SwapNode::with_clock(config, Arc::new(ManualClock::default()));
        assert!(matches!(result, Err(NodeConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_demo_swap_completes() {
        let node = node();
        let order = tokio_test::assert_ok!(node.run_demo().await);
        assert_eq!(order.status, SwapStatus::Completed);

        let statuses = node.coordinator().escrow_statuses(order.id).await.unwrap();
        assert_eq!(
            statuses,
            vec![
                (EscrowRole::Source, EscrowStatus::Withdrawn),
                (EscrowRole::Destination, EscrowStatus::Withdrawn),
            ]
        );

        let near = node.ledger(LedgerId::Near).unwrap();
        assert_eq!(
            near.balance_of(&order.recipient_address),
            node.config().demo.destination_amount
        );
    }

    #[tokio::test]
    async fn test_event_logger_stops_on_shutdown() {
        let node = node();
        let logger = node.start();
        node.run_demo().await.unwrap();
        assert!(node.event_bus().events_published() > 0);

        node.shutdown().await;
        tokio::time::timeout(Duration::from_secs(1), logger)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_describe() {
        let swap_id = SwapId::new();
        let text = describe(&SwapEvent::SwapStatusChanged {
            swap_id,
            from: SwapStatus::Created,
            to: SwapStatus::FirstLegPending,
        });
        assert_eq!(text, format!("{swap_id} Created -> FirstLegPending"));

        let text = describe(&SwapEvent::Error {
            swap_id,
            message: "reverted".into(),
            recoverable: true,
        });
        assert!(text.contains("recoverable=true"));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14T22:13:20+00:00");
        assert_eq!(format_timestamp(u64::MAX), u64::MAX.to_string());
    }
}
