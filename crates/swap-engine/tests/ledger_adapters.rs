//! # Ledger Adapter Tests
//!
//! EVM and NEAR escrow adapters end-to-end against the simulated ledger:
//! wire encoding, deterministic addresses, window and role enforcement,
//! deposits, payouts and transport faults.

use serde_json::Value;
use std::sync::Arc;
use swap_engine::adapters::{
    EvmEscrowAdapter, EvmEscrowConfig, InMemorySwapRepository, ManualClock, NearEscrowAdapter,
    NearEscrowConfig, NoOpPublisher, SimulatedLedger, CREATE_DST_SIGNATURE, CREATE_SRC_SIGNATURE,
    WITHDRAW_METHOD, WITHDRAW_SIGNATURE,
};
use swap_engine::adapters::decode_secret_arg;
use swap_engine::algorithms::{compute_hashlock, function_selector, generate_secret};
use swap_engine::config::{CoordinatorConfig, EvmSettings, LedgerConfig};
use swap_engine::domain::{
    ChainCallKind, EscrowImmutables, EscrowRole, EscrowStatus, LedgerAddress, LedgerId, LedgerKind,
    SecureSecret, SwapError, SwapStatus, TimelockSchedule, Timelocks, TokenRef,
};
use swap_engine::ports::{Clock, EscrowPort, SwapCoordinatorApi, WirePayload};
use swap_engine::service::SwapCoordinator;
use swap_engine::test_utils::{sample_request, SAMPLE_EVM_USER, SAMPLE_NEAR_USER};

const EVM_RESOLVER: &str = "0x2222222222222222222222222222222222222222";
const EVM_FACTORY: &str = "0x3333333333333333333333333333333333333333";
const NEAR_RESOLVER: &str = "resolver.near";
const NEAR_FACTORY: &str = "factory.near";
const SAFETY_DEPOSIT: u128 = 1_000;

// =============================================================================
// TEST HELPERS
// =============================================================================

struct Network {
    clock: Arc<ManualClock>,
    ethereum: Arc<SimulatedLedger>,
    near: Arc<SimulatedLedger>,
    evm_adapter: Arc<EvmEscrowAdapter>,
    near_adapter: Arc<NearEscrowAdapter>,
    coordinator: SwapCoordinator,
}

fn ledger_config(id: LedgerId, resolver: &str, factory: &str) -> LedgerConfig {
    let mut config = LedgerConfig::new(id, resolver, factory);
    config.safety_deposit = SAFETY_DEPOSIT;
    config.confirmation_timeout_secs = 1;
    config.poll_interval_ms = 10;
    if id.kind() == LedgerKind::Evm {
        config.evm = Some(EvmSettings {
            src_init_code_hash: format!("0x{}", "11".repeat(32)),
            dst_init_code_hash: format!("0x{}", "22".repeat(32)),
        });
    }
    config
}

fn network() -> Network {
    let clock = Arc::new(ManualClock::default());
    let ethereum = Arc::new(SimulatedLedger::new(LedgerId::Ethereum, clock.clone()));
    let near = Arc::new(SimulatedLedger::new(LedgerId::Near, clock.clone()));

    let evm_config = ledger_config(LedgerId::Ethereum, EVM_RESOLVER, EVM_FACTORY);
    let near_config = ledger_config(LedgerId::Near, NEAR_RESOLVER, NEAR_FACTORY);
    let evm_adapter = Arc::new(EvmEscrowAdapter::new(
        EvmEscrowConfig::from_ledger_config(&evm_config).unwrap(),
        ethereum.clone(),
    ));
    let near_adapter = Arc::new(NearEscrowAdapter::new(
        NearEscrowConfig::from_ledger_config(&near_config).unwrap(),
        near.clone(),
    ));

    let coordinator = SwapCoordinator::new(
        CoordinatorConfig::default(),
        Arc::new(InMemorySwapRepository::new()),
        Arc::new(NoOpPublisher),
        clock.clone(),
    )
    .with_ledger(evm_adapter.clone(), evm_config.limits())
    .with_ledger(near_adapter.clone(), near_config.limits());

    Network {
        clock,
        ethereum,
        near,
        evm_adapter,
        near_adapter,
        coordinator,
    }
}

fn evm(raw: &str) -> LedgerAddress {
    LedgerAddress::parse(LedgerKind::Evm, raw).unwrap()
}

fn near(raw: &str) -> LedgerAddress {
    LedgerAddress::parse(LedgerKind::Near, raw).unwrap()
}

/// Source immutables on Ethereum deployed now, short schedule.
fn source_immutables(net: &Network, secret: &SecureSecret) -> EscrowImmutables {
    EscrowImmutables {
        order_hash: [0x07; 32],
        hashlock: compute_hashlock(secret.as_bytes()),
        maker: evm(SAMPLE_EVM_USER),
        taker: net.evm_adapter.resolver_address().clone(),
        token: TokenRef::Native,
        amount: 5_000,
        safety_deposit: 100,
        timelocks: Timelocks::new(
            net.clock.now(),
            TimelockSchedule::new(10, 100, 1_000, 10_000).unwrap(),
        ),
    }
}

// =============================================================================
// END TO END
// =============================================================================

#[tokio::test]
async fn test_swap_settles_on_both_ledgers() {
    let net = network();
    let request = sample_request(LedgerId::Ethereum, LedgerId::Near);
    let order = net.coordinator.create(request.clone()).await.unwrap();
    net.coordinator.run_first_leg(order.id).await.unwrap();
    let order = net.coordinator.run_second_leg(order.id).await.unwrap();

    let source = order.source_escrow.clone().unwrap();
    let destination = order.destination_escrow.clone().unwrap();
    assert_eq!(
        net.ethereum.escrow_balance(&source.address),
        Some(request.amount + SAFETY_DEPOSIT)
    );
    assert_eq!(
        net.near.escrow_balance(&destination.address),
        Some(request.destination_amount + SAFETY_DEPOSIT)
    );

    net.clock.advance(200);
    let done = net
        .coordinator
        .complete(order.id, order.secret.clone())
        .await
        .unwrap();
    assert_eq!(done.status, SwapStatus::Completed);

    // source pays the resolver, destination pays the user
    assert_eq!(
        net.ethereum.balance_of(&evm(EVM_RESOLVER)),
        request.amount + SAFETY_DEPOSIT
    );
    assert_eq!(
        net.near.balance_of(&near(SAMPLE_NEAR_USER)),
        request.destination_amount
    );
    assert_eq!(net.near.balance_of(&near(NEAR_RESOLVER)), SAFETY_DEPOSIT);
    assert_eq!(net.ethereum.escrow_balance(&source.address), Some(0));

    let statuses = net.coordinator.escrow_statuses(order.id).await.unwrap();
    assert_eq!(
        statuses,
        vec![
            (EscrowRole::Source, EscrowStatus::Withdrawn),
            (EscrowRole::Destination, EscrowStatus::Withdrawn),
        ]
    );
}

#[tokio::test]
async fn test_cancelled_swap_refunds_both_sides() {
    let net = network();
    let request = sample_request(LedgerId::Ethereum, LedgerId::Near);
    let order = net.coordinator.create(request.clone()).await.unwrap();
    net.coordinator.run_first_leg(order.id).await.unwrap();
    net.coordinator.run_second_leg(order.id).await.unwrap();

    net.clock.advance(7_300);
    let cancelled = net.coordinator.cancel(order.id).await.unwrap();
    assert_eq!(cancelled.status, SwapStatus::Cancelled);

    assert_eq!(net.ethereum.balance_of(&evm(SAMPLE_EVM_USER)), request.amount);
    assert_eq!(
        net.near.balance_of(&near(NEAR_RESOLVER)),
        request.destination_amount + SAFETY_DEPOSIT
    );
}

#[tokio::test]
async fn test_reverse_direction_near_to_ethereum() {
    let net = network();
    let order = net
        .coordinator
        .create(sample_request(LedgerId::Near, LedgerId::Ethereum))
        .await
        .unwrap();
    net.coordinator.run_first_leg(order.id).await.unwrap();
    net.coordinator.run_second_leg(order.id).await.unwrap();
    // Ethereum destination finality (144s) gates the destination withdrawal
    net.clock.advance(200);
    let done = net
        .coordinator
        .complete(order.id, order.secret.clone())
        .await
        .unwrap();
    assert_eq!(done.status, SwapStatus::Completed);
    assert_eq!(net.ethereum.balance_of(&evm(SAMPLE_EVM_USER)), order.destination_amount);
}

// =============================================================================
// WIRE ENCODING
// =============================================================================

#[tokio::test]
async fn test_evm_calls_carry_selector_and_value() {
    let net = network();
    let order = net
        .coordinator
        .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
        .await
        .unwrap();
    let order = net.coordinator.run_first_leg(order.id).await.unwrap();
    let source = order.source_escrow.unwrap();

    let calls = net.ethereum.submitted_calls();
    assert_eq!(calls.len(), 1);
    match &calls[0].payload {
        WirePayload::Evm { to, calldata, value } => {
            assert_eq!(LedgerAddress::Evm(*to), evm(EVM_FACTORY));
            assert_eq!(calldata[..4], function_selector(CREATE_SRC_SIGNATURE));
            assert_eq!(calldata.len(), 4 + 8 * 32);
            assert_eq!(*value, order.amount + SAFETY_DEPOSIT);
        }
        other => panic!("expected EVM payload, got {other:?}"),
    }
    assert_eq!(calls[0].caller, evm(EVM_RESOLVER));

    net.clock.advance(200);
    net.evm_adapter
        .withdraw(&source, &order.secret)
        .await
        .unwrap();
    match &net.ethereum.submitted_calls()[1].payload {
        WirePayload::Evm { to, calldata, value } => {
            assert_eq!(LedgerAddress::Evm(*to), source.address);
            assert_eq!(calldata[..4], function_selector(WITHDRAW_SIGNATURE));
            assert_eq!(*value, 0);
        }
        other => panic!("expected EVM payload, got {other:?}"),
    }
    assert_ne!(function_selector(CREATE_SRC_SIGNATURE), function_selector(CREATE_DST_SIGNATURE));
}

#[tokio::test]
async fn test_near_calls_carry_json_args() {
    let net = network();
    let order = net
        .coordinator
        .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
        .await
        .unwrap();
    net.coordinator.run_first_leg(order.id).await.unwrap();
    net.coordinator.run_second_leg(order.id).await.unwrap();

    let calls = net.near.submitted_calls();
    match &calls[0].payload {
        WirePayload::Near {
            receiver,
            method,
            args_json,
            deposit,
        } => {
            assert_eq!(receiver, NEAR_FACTORY);
            assert_eq!(method, "create_dst_escrow");
            let args: Value = serde_json::from_str(args_json).unwrap();
            assert_eq!(args["immutables"]["maker"], SAMPLE_NEAR_USER);
            assert_eq!(args["immutables"]["taker"], NEAR_RESOLVER);
            assert_eq!(
                args["immutables"]["amount"],
                order.destination_amount.to_string()
            );
            assert_eq!(args["immutables"]["hashlock"], hex::encode(order.hashlock));
            // creation fee 0 + default storage deposit + safety + amount
            assert!(*deposit > order.destination_amount + SAFETY_DEPOSIT);
        }
        other => panic!("expected NEAR payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_near_withdraw_secret_hashes_to_hashlock() {
    let net = network();
    let order = net
        .coordinator
        .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
        .await
        .unwrap();
    net.coordinator.run_first_leg(order.id).await.unwrap();
    net.coordinator.run_second_leg(order.id).await.unwrap();
    net.clock.advance(200);
    net.coordinator
        .complete(order.id, order.secret.clone())
        .await
        .unwrap();

    let withdraw = net
        .near
        .submitted_calls()
        .into_iter()
        .find_map(|call| match call.payload {
            WirePayload::Near { method, args_json, .. } if method == WITHDRAW_METHOD => Some(args_json),
            _ => None,
        })
        .expect("NEAR withdraw submitted");
    let args: Value = serde_json::from_str(&withdraw).unwrap();

    // the escrow base64-decodes the argument and hashes the bytes
    let preimage = decode_secret_arg(args["secret"].as_str().unwrap()).unwrap();
    assert_eq!(compute_hashlock(&preimage), order.hashlock);
    assert_eq!(preimage, order.secret.as_bytes());
    assert_ne!(args["secret"], order.secret.to_hex());
}

#[tokio::test]
async fn test_escrow_addresses_are_deterministic() {
    let net = network();
    let order = net
        .coordinator
        .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
        .await
        .unwrap();
    net.coordinator.run_first_leg(order.id).await.unwrap();
    let order = net.coordinator.run_second_leg(order.id).await.unwrap();

    let source = order.source_escrow.unwrap();
    let destination = order.destination_escrow.unwrap();
    assert_eq!(
        net.evm_adapter
            .compute_address(&source.immutables, EscrowRole::Source)
            .unwrap(),
        source.address
    );
    assert_eq!(
        net.near_adapter
            .compute_address(&destination.immutables, EscrowRole::Destination)
            .unwrap(),
        destination.address
    );
    let account = destination.address.as_near().unwrap();
    assert!(account.starts_with("dst-"));
    assert!(account.ends_with(".factory.near"));

    // a different role lands elsewhere
    assert_ne!(
        net.evm_adapter
            .compute_address(&source.immutables, EscrowRole::Destination)
            .unwrap(),
        source.address
    );
}

// =============================================================================
// ENFORCEMENT
// =============================================================================

#[tokio::test]
async fn test_insufficient_deposit_is_rejected_before_submission() {
    let net = network();
    let secret = generate_secret();
    let immutables = source_immutables(&net, &secret);
    let err = net
        .evm_adapter
        .create_source(immutables, 100)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ChainCallKind::InsufficientFunds);
    assert!(net.ethereum.submitted_calls().is_empty());
}

#[tokio::test]
async fn test_foreign_taker_is_rejected() {
    let net = network();
    let secret = generate_secret();
    let mut immutables = source_immutables(&net, &secret);
    immutables.taker = evm("0x4444444444444444444444444444444444444444");
    let deposit = net.evm_adapter.required_deposit(&immutables);
    let err = net
        .evm_adapter
        .create_source(immutables, deposit)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ChainCallKind::InvalidState);
}

#[tokio::test]
async fn test_withdraw_window_enforced_by_adapter() {
    let net = network();
    let secret = generate_secret();
    let immutables = source_immutables(&net, &secret);
    let deposit = net.evm_adapter.required_deposit(&immutables);
    let escrow = net
        .evm_adapter
        .create_source(immutables, deposit)
        .await
        .unwrap();

    let err = net.evm_adapter.withdraw(&escrow, &secret).await.unwrap_err();
    assert_eq!(err.kind, ChainCallKind::InvalidState);
    assert_eq!(net.ethereum.submitted_calls().len(), 1);

    net.clock.advance(1_000);
    assert!(net.evm_adapter.withdraw(&escrow, &secret).await.is_err());
    net.evm_adapter.cancel(&escrow).await.unwrap();
    assert_eq!(
        net.evm_adapter.status(&escrow).await.unwrap(),
        EscrowStatus::Cancelled
    );
}

#[tokio::test]
async fn test_wrong_secret_rejected_by_adapter() {
    let net = network();
    let secret = generate_secret();
    let immutables = source_immutables(&net, &secret);
    let deposit = net.evm_adapter.required_deposit(&immutables);
    let escrow = net
        .evm_adapter
        .create_source(immutables, deposit)
        .await
        .unwrap();
    net.clock.advance(10);

    let err = net
        .evm_adapter
        .withdraw(&escrow, &generate_secret())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ChainCallKind::InvalidState);
    assert_eq!(
        net.evm_adapter.status(&escrow).await.unwrap(),
        EscrowStatus::Active
    );
}

#[tokio::test]
async fn test_rescue_after_delay() {
    let net = network();
    let secret = generate_secret();
    let immutables = source_immutables(&net, &secret);
    let deposit = net.evm_adapter.required_deposit(&immutables);
    let escrow = net
        .evm_adapter
        .create_source(immutables, deposit)
        .await
        .unwrap();

    assert!(net.evm_adapter.rescue(&escrow).await.is_err());
    net.clock.advance(10_000);
    net.evm_adapter.rescue(&escrow).await.unwrap();
    assert_eq!(
        net.evm_adapter.status(&escrow).await.unwrap(),
        EscrowStatus::Rescued
    );
    assert_eq!(net.ethereum.balance_of(&evm(EVM_RESOLVER)), 5_100);
}

#[tokio::test]
async fn test_escrow_from_other_ledger_rejected() {
    let net = network();
    let secret = generate_secret();
    let immutables = source_immutables(&net, &secret);
    let deposit = net.evm_adapter.required_deposit(&immutables);
    let escrow = net
        .evm_adapter
        .create_source(immutables, deposit)
        .await
        .unwrap();

    let err = net.near_adapter.cancel(&escrow).await.unwrap_err();
    assert_eq!(err.kind, ChainCallKind::InvalidState);
    assert!(net.near.submitted_calls().is_empty());
}

// =============================================================================
// TRANSPORT FAULTS
// =============================================================================

#[tokio::test]
async fn test_revert_fails_the_leg() {
    let net = network();
    let order = net
        .coordinator
        .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
        .await
        .unwrap();
    net.ethereum.revert_next("out of gas");

    let err = net.coordinator.run_first_leg(order.id).await.unwrap_err();
    match err {
        SwapError::ChainCall(e) => {
            assert_eq!(e.kind, ChainCallKind::Reverted);
            assert_eq!(e.detail, "out of gas");
        }
        other => panic!("expected chain call error, got {other:?}"),
    }
    let failed = net.coordinator.get(order.id).await.unwrap();
    assert_eq!(failed.status, SwapStatus::Failed);
    assert!(!failed.error.unwrap().retryable);
}

#[tokio::test]
async fn test_rate_limited_transport() {
    let net = network();
    let order = net
        .coordinator
        .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
        .await
        .unwrap();
    net.ethereum.set_rate_limited(true);

    let err = net.coordinator.run_first_leg(order.id).await.unwrap_err();
    assert!(matches!(err, SwapError::ChainCall(ref e) if e.kind == ChainCallKind::RateLimited));
}

#[tokio::test]
async fn test_missing_receipt_leaves_unknown_state() {
    let net = network();
    let order = net
        .coordinator
        .create(sample_request(LedgerId::Ethereum, LedgerId::Near))
        .await
        .unwrap();
    net.coordinator.run_first_leg(order.id).await.unwrap();
    net.near.withhold_receipts(true);

    let err = net.coordinator.run_second_leg(order.id).await.unwrap_err();
    assert!(matches!(err, SwapError::ChainCall(ref e) if e.kind == ChainCallKind::Timeout));

    let failed = net.coordinator.get(order.id).await.unwrap();
    assert_eq!(failed.status, SwapStatus::Failed);
    assert!(failed.error.unwrap().unknown_ledger_state);
    assert!(failed.destination_escrow.is_none());

    // the call did land: exactly why the outcome is reported as unknown
    let calls = net.near.submitted_calls();
    assert_eq!(calls.len(), 1);
}
