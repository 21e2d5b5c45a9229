//! # Configuration
//!
//! Serde-deserializable settings for the coordinator and each ledger
//! adapter. Every field has a default so partial config files work.

use crate::domain::{
    invariant_cross_escrow_windows, invariant_timelock_ordering, LedgerId, TimelockSchedule, Timelocks,
    DEFAULT_SECRET_LEN, MAX_SECRET_LEN, MIN_SECRET_LEN, MIN_WINDOW_MARGIN_SECS,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Field value does not parse.
    #[error("Invalid {field} for {ledger}: {reason}")]
    InvalidField {
        /// Ledger section
        ledger: LedgerId,
        /// Field name
        field: &'static str,
        /// Parse failure
        reason: String,
    },

    /// Same ledger configured twice.
    #[error("Ledger configured more than once: {0}")]
    DuplicateLedger(LedgerId),

    /// Value out of range.
    #[error("Invalid setting {field}: {reason}")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Why
        reason: String,
    },
}

/// Coordinator settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Timeout applied to every adapter call unless overridden per call.
    pub call_timeout_secs: u64,
    /// Length of generated secrets.
    pub secret_len: usize,
    /// Minimum gap between destination withdrawal close and source
    /// cancellation open.
    pub min_window_margin_secs: u64,
    /// Longest expected delay between the two escrow deployments.
    pub max_leg_gap_secs: u64,
    /// Source escrow schedule.
    pub source_schedule: TimelockSchedule,
    /// Destination escrow schedule.
    pub destination_schedule: TimelockSchedule,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 120,
            secret_len: DEFAULT_SECRET_LEN,
            min_window_margin_secs: MIN_WINDOW_MARGIN_SECS,
            max_leg_gap_secs: 1_800,
            source_schedule: TimelockSchedule {
                private_withdrawal: 0,
                public_withdrawal: 1_800,
                cancellation: 7_200,
                rescue: 604_800,
            },
            destination_schedule: TimelockSchedule {
                private_withdrawal: 0,
                public_withdrawal: 900,
                cancellation: 3_600,
                rescue: 604_800,
            },
        }
    }
}

impl CoordinatorConfig {
    /// Default adapter call timeout.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Check ranges that serde cannot express.
    ///
    /// Schedules are checked without ledger finality floors; those depend on
    /// the swap's ledgers and are applied again when an order is planned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let out_of_range = |field: &'static str, reason: String| ConfigError::OutOfRange { field, reason };

        if self.call_timeout_secs == 0 {
            return Err(out_of_range("call_timeout_secs", "must be positive".into()));
        }
        if !(MIN_SECRET_LEN..=MAX_SECRET_LEN).contains(&self.secret_len) {
            return Err(out_of_range(
                "secret_len",
                format!("must be between {MIN_SECRET_LEN} and {MAX_SECRET_LEN}"),
            ));
        }
        // Timelock offsets are 32-bit; durations beyond that cannot be scheduled.
        let max_secs = u64::from(u32::MAX);
        if self.min_window_margin_secs == 0 || self.min_window_margin_secs > max_secs {
            return Err(out_of_range(
                "min_window_margin_secs",
                format!("must be between 1 and {max_secs}"),
            ));
        }
        if self.max_leg_gap_secs > max_secs {
            return Err(out_of_range("max_leg_gap_secs", format!("must be at most {max_secs}")));
        }

        invariant_timelock_ordering(&self.source_schedule)
            .map_err(|e| out_of_range("source_schedule", e.to_string()))?;
        invariant_timelock_ordering(&self.destination_schedule)
            .map_err(|e| out_of_range("destination_schedule", e.to_string()))?;
        invariant_cross_escrow_windows(
            &Timelocks::new(0, self.source_schedule),
            &Timelocks::new(self.max_leg_gap_secs, self.destination_schedule),
            self.min_window_margin_secs,
        )
        .map_err(|e| out_of_range("destination_schedule", e.to_string()))?;
        Ok(())
    }
}

/// Settings for one ledger adapter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger this section configures.
    pub id: LedgerId,
    /// Concurrent in-flight adapter calls.
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,
    /// Safety deposit attached to every escrow (base units).
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub safety_deposit: u128,
    /// Resolver account the adapter acts as.
    pub resolver: String,
    /// Escrow factory address / account.
    pub factory: String,
    /// Resolver holds the public-withdrawal access credential.
    #[serde(default)]
    pub has_access_token: bool,
    /// How long to wait for a receipt.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Receipt polling interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// EVM-only settings.
    #[serde(default)]
    pub evm: Option<EvmSettings>,
    /// NEAR-only settings.
    #[serde(default)]
    pub near: Option<NearSettings>,
}

/// EVM factory parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmSettings {
    /// Hex keccak256 of the source escrow proxy init code.
    pub src_init_code_hash: String,
    /// Hex keccak256 of the destination escrow proxy init code.
    pub dst_init_code_hash: String,
}

/// NEAR factory parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearSettings {
    /// Factory creation fee (yoctoNEAR).
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub creation_fee: u128,
    /// Storage staking for the escrow sub-account (yoctoNEAR).
    #[serde(default = "default_storage_deposit", deserialize_with = "deserialize_amount")]
    pub storage_deposit: u128,
}

fn default_max_concurrent_calls() -> usize {
    4
}

fn default_confirmation_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// 1 NEAR, the escrow factory's minimum storage deposit.
pub const DEFAULT_NEAR_STORAGE_DEPOSIT: u128 = 1_000_000_000_000_000_000_000_000;

fn default_storage_deposit() -> u128 {
    DEFAULT_NEAR_STORAGE_DEPOSIT
}

impl LedgerConfig {
    /// Minimal config for `id` with default limits.
    pub fn new(id: LedgerId, resolver: impl Into<String>, factory: impl Into<String>) -> Self {
        Self {
            id,
            max_concurrent_calls: default_max_concurrent_calls(),
            safety_deposit: 0,
            resolver: resolver.into(),
            factory: factory.into(),
            has_access_token: false,
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            evm: None,
            near: None,
        }
    }

    /// Receipt wait limit.
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Receipt polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Executor limits for this ledger.
    pub fn limits(&self) -> LedgerLimits {
        LedgerLimits {
            max_concurrent_calls: self.max_concurrent_calls.max(1),
            safety_deposit: self.safety_deposit,
        }
    }
}

/// What the coordinator needs to know about a ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerLimits {
    /// Concurrent in-flight adapter calls.
    pub max_concurrent_calls: usize,
    /// Safety deposit per escrow.
    pub safety_deposit: u128,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            max_concurrent_calls: default_max_concurrent_calls(),
            safety_deposit: 0,
        }
    }
}

/// Check a set of ledger sections for duplicates.
pub fn validate_ledgers(ledgers: &[LedgerConfig]) -> Result<(), ConfigError> {
    let mut seen = Vec::with_capacity(ledgers.len());
    for ledger in ledgers {
        if seen.contains(&ledger.id) {
            return Err(ConfigError::DuplicateLedger(ledger.id));
        }
        seen.push(ledger.id);
    }
    Ok(())
}

/// Accept amounts as integers or decimal strings. TOML integers are 64-bit,
/// which is too narrow for yoctoNEAR.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Int(u64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Int(value) => Ok(u128::from(value)),
        Amount::Text(text) => text
            .replace('_', "")
            .parse::<u128>()
            .map_err(serde::de::Error::custom),
    }
}
