//! # Service Layer
//!
//! The swap coordinator and the concurrency primitives it runs on.

mod coordinator;
mod executor;
mod locks;

pub use coordinator::{SwapCoordinator, MAX_SLIPPAGE_BPS};
pub use executor::LedgerExecutor;
pub use locks::{SwapLockGuard, SwapLockRegistry};
