//! # Node Configuration
//!
//! Loaded from a TOML file, then overridden from the environment.
//!
//! ```toml
//! log_level = "info"
//!
//! [coordinator]
//! call_timeout_secs = 120
//!
//! [[ledgers]]
//! id = "near"
//! resolver = "resolver.near"
//! factory = "factory.near"
//! safety_deposit = "1_000_000_000_000_000_000_000"
//!
//! [demo]
//! enabled = false
//! ```
//!
//! ## Lookup Order
//!
//! 1. `--config <path>` argument, or `SWAP_NODE_CONFIG` (see [`Cli`])
//! 2. Built-in defaults (Ethereum and NEAR)

use crate::cli::Cli;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use swap_engine::config::{
    deserialize_amount, validate_ledgers, ConfigError, CoordinatorConfig, EvmSettings,
    LedgerConfig, NearSettings, DEFAULT_NEAR_STORAGE_DEPOSIT,
};
use swap_engine::domain::{LedgerId, SwapRequest};
use thiserror::Error;

/// Adapter call timeout override (seconds).
pub const CALL_TIMEOUT_VAR: &str = "SWAP_CALL_TIMEOUT_SECS";
/// Log level override.
pub const LOG_LEVEL_VAR: &str = "SWAP_LOG_LEVEL";

/// Node configuration error.
#[derive(Debug, Error)]
pub enum NodeConfigError {
    /// File I/O error.
    #[error("Failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// TOML parsing error.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Environment override does not parse.
    #[error("Invalid value for {var}: {value:?}")]
    Env {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },

    /// Demo swap names a ledger with no section.
    #[error("Demo ledger not configured: {0}")]
    DemoLedger(LedgerId),

    /// Engine settings rejected.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Top-level node configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Coordinator settings.
    pub coordinator: CoordinatorConfig,
    /// One section per ledger (`[[ledgers]]`).
    pub ledgers: Vec<LedgerConfig>,
    /// Demo swap run at startup.
    pub demo: DemoConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            coordinator: CoordinatorConfig::default(),
            ledgers: default_ledgers(),
            demo: DemoConfig::default(),
        }
    }
}

fn default_ledgers() -> Vec<LedgerConfig> {
    let mut ethereum = LedgerConfig::new(
        LedgerId::Ethereum,
        "0x2222222222222222222222222222222222222222",
        "0x3333333333333333333333333333333333333333",
    );
    ethereum.safety_deposit = 1_000_000_000_000_000; // 0.001 ETH
    ethereum.evm = Some(EvmSettings {
        src_init_code_hash: format!("0x{}", "11".repeat(32)),
        dst_init_code_hash: format!("0x{}", "22".repeat(32)),
    });

    let mut near = LedgerConfig::new(LedgerId::Near, "resolver.near", "factory.near");
    near.safety_deposit = 1_000_000_000_000_000_000_000; // 0.001 NEAR
    near.near = Some(NearSettings {
        creation_fee: 0,
        storage_deposit: DEFAULT_NEAR_STORAGE_DEPOSIT,
    });

    vec![ethereum, near]
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NodeConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| NodeConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, NodeConfigError> {
        toml::from_str(content).map_err(|e| NodeConfigError::Parse(e.to_string()))
    }

    /// Apply `SWAP_CALL_TIMEOUT_SECS` and `SWAP_LOG_LEVEL`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), NodeConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(CALL_TIMEOUT_VAR) {
            self.coordinator.call_timeout_secs =
                value.trim().parse().map_err(|_| NodeConfigError::Env {
                    var: CALL_TIMEOUT_VAR,
                    value,
                })?;
        }
        if let Some(value) = lookup(LOG_LEVEL_VAR) {
            if !value.trim().is_empty() {
                self.log_level = value.trim().to_string();
            }
        }
        Ok(())
    }

    /// Check coordinator and ledger sections.
    pub fn validate(&self) -> Result<(), NodeConfigError> {
        self.coordinator.validate()?;
        validate_ledgers(&self.ledgers)?;
        if self.demo.enabled {
            for id in [self.demo.source, self.demo.destination] {
                if self.ledger(id).is_none() {
                    return Err(NodeConfigError::DemoLedger(id));
                }
            }
        }
        Ok(())
    }

    /// Section for `id`.
    pub fn ledger(&self, id: LedgerId) -> Option<&LedgerConfig> {
        self.ledgers.iter().find(|l| l.id == id)
    }
}

/// Swap submitted by the node at startup.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Run the demo swap.
    pub enabled: bool,
    /// Ledger the user pays on.
    pub source: LedgerId,
    /// Ledger the user receives on.
    pub destination: LedgerId,
    /// Source asset (`native` or contract).
    pub source_token: String,
    /// Destination asset.
    pub destination_token: String,
    /// Source amount (base units).
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: u128,
    /// Destination amount (base units).
    #[serde(deserialize_with = "deserialize_amount")]
    pub destination_amount: u128,
    /// User on the source ledger.
    pub user_address: String,
    /// User on the destination ledger.
    pub recipient_address: String,
    /// Slippage tolerance (bps).
    pub slippage_bps: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source: LedgerId::Ethereum,
            destination: LedgerId::Near,
            source_token: "native".into(),
            destination_token: "native".into(),
            amount: 100_000_000_000_000_000,                        // 0.1 ETH
            destination_amount: 25_000_000_000_000_000_000_000_000, // 25 NEAR
            user_address: "0x1111111111111111111111111111111111111111".into(),
            recipient_address: "alice.near".into(),
            slippage_bps: 50,
        }
    }
}

impl DemoConfig {
    /// Request the coordinator receives.
    pub fn request(&self) -> SwapRequest {
        SwapRequest {
            source_ledger: self.source,
            destination_ledger: self.destination,
            source_token: self.source_token.clone(),
            destination_token: self.destination_token.clone(),
            amount: self.amount,
            destination_amount: self.destination_amount,
            user_address: self.user_address.clone(),
            recipient_address: self.recipient_address.clone(),
            slippage_bps: self.slippage_bps,
        }
    }
}

/// Load configuration from the command line, files and environment.
///
/// `lookup` reads environment variables; the binary passes
/// `std::env::var`.
pub fn load_config<F>(cli: &Cli, lookup: F) -> Result<NodeConfig, NodeConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &cli.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };

    config.apply_env_overrides(&lookup)?;
    config.validate()?;
    Ok(config)
}
