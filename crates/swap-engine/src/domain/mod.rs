//! # Domain Module
//!
//! Core domain types for swap orchestration.

pub mod entities;
pub mod errors;
pub mod events;
pub mod invariants;
pub mod secure_secret;
pub mod timelocks;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use events::SwapEvent;
pub use invariants::*;
pub use secure_secret::{SecureSecret, DEFAULT_SECRET_LEN, MAX_SECRET_LEN, MIN_SECRET_LEN};
pub use timelocks::{Caller, TimelockSchedule, TimelockStage, Timelocks};
pub use value_objects::*;
