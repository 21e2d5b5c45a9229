//! Per-ledger call executor.
//!
//! Every adapter call runs as its own spawned task bound to one swap id, with
//! concurrency per ledger capped by a semaphore. The caller's timeout covers
//! both the wait for a permit and the call itself. A call that times out
//! keeps running to completion in the background: its transaction may
//! already be in flight, so the outcome is reported as unknown.

use crate::config::LedgerLimits;
use crate::domain::{ChainCallError, ChainCallKind, EscrowOperation, LedgerId, SwapId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{info_span, warn, Instrument};

/// Bounded worker pool per ledger.
#[derive(Default)]
pub struct LedgerExecutor {
    permits: HashMap<LedgerId, Arc<Semaphore>>,
}

impl LedgerExecutor {
    /// Create an executor with no ledgers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ledger's concurrency cap.
    pub fn register(&mut self, ledger: LedgerId, limits: LedgerLimits) {
        self.permits
            .insert(ledger, Arc::new(Semaphore::new(limits.max_concurrent_calls.max(1))));
    }

    /// Run `call` on `ledger` for `swap_id` within `timeout`.
    ///
    /// - no permit within the timeout: `RateLimited` (nothing was submitted)
    /// - call not finished within the remaining time: `Timeout`
    /// - call task panicked: `Timeout` (outcome unknown)
    pub async fn run<T, F, Fut>(
        &self,
        ledger: LedgerId,
        swap_id: SwapId,
        operation: EscrowOperation,
        timeout: Duration,
        call: F,
    ) -> Result<T, ChainCallError>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ChainCallError>> + Send + 'static,
    {
        let semaphore = self.permits.get(&ledger).cloned().ok_or_else(|| {
            ChainCallError::new(ledger, operation, ChainCallKind::InvalidState, "ledger not registered")
        })?;
        let deadline = Instant::now() + timeout;

        let permit = tokio::time::timeout_at(deadline, semaphore.acquire_owned())
            .await
            .map_err(|_| {
                ChainCallError::new(
                    ledger,
                    operation,
                    ChainCallKind::RateLimited,
                    format!("no {ledger} call slot within {timeout:?}"),
                )
            })?
            .map_err(|_| ChainCallError::new(ledger, operation, ChainCallKind::RateLimited, "executor closed"))?;

        let span = info_span!("ledger_call", %swap_id, %ledger, %operation);
        let pending = call();
        let task = tokio::spawn(
            async move {
                let _permit = permit;
                pending.await
            }
            .instrument(span),
        );

        match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                warn!(%swap_id, %ledger, %operation, "Ledger call task failed: {}", join_error);
                Err(ChainCallError::timeout(
                    ledger,
                    operation,
                    format!("call task aborted: {join_error}"),
                ))
            }
            Err(_) => {
                warn!(%swap_id, %ledger, %operation, "Ledger call exceeded {:?}", timeout);
                Err(ChainCallError::timeout(
                    ledger,
                    operation,
                    format!("no result within {timeout:?}"),
                ))
            }
        }
    }
}
