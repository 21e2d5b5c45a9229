//! # Inbound Ports
//!
//! API trait defining what the swap coordinator can do. The transport layer
//! (HTTP, WebSocket, CLI) drives swaps exclusively through this trait.

use crate::domain::{SecureSecret, SwapError, SwapId, SwapOrder, SwapRequest, TxRef};
use async_trait::async_trait;

/// Swap coordinator API - inbound port.
#[async_trait]
pub trait SwapCoordinatorApi: Send + Sync {
    /// Validate a request and store a new order in `Created`.
    async fn create(&self, request: SwapRequest) -> Result<SwapOrder, SwapError>;

    /// Create the source escrow.
    async fn run_first_leg(&self, id: SwapId) -> Result<SwapOrder, SwapError>;

    /// Create the destination escrow.
    async fn run_second_leg(&self, id: SwapId) -> Result<SwapOrder, SwapError>;

    /// Reveal the secret: withdraw destination, then source.
    async fn complete(&self, id: SwapId, secret: SecureSecret) -> Result<SwapOrder, SwapError>;

    /// Cancel every existing escrow.
    async fn cancel(&self, id: SwapId) -> Result<SwapOrder, SwapError>;

    /// Operator hook: retry the source withdrawal of a recoverable failure.
    async fn recover_partial_failure(&self, id: SwapId) -> Result<TxRef, SwapError>;

    /// Look up an order.
    async fn get(&self, id: SwapId) -> Result<SwapOrder, SwapError>;

    /// All orders.
    async fn list(&self) -> Result<Vec<SwapOrder>, SwapError>;
}
