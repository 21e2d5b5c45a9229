//! # Swap Node Library
//!
//! Configuration loading and runtime wiring for the `swap-node` binary,
//! exposed as a library for testing. The entry point is `main.rs`.
//!
//! ## Architectural Patterns
//!
//! - **Hexagonal Architecture**: the engine defines ports, the node picks
//!   adapters for each configured ledger
//! - **Event fan-out**: coordinator events go to a broadcast bus that the
//!   node logs from

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod runtime;

pub use cli::Cli;
pub use config::{load_config, DemoConfig, NodeConfig, NodeConfigError};
pub use runtime::SwapNode;
