//! # Timelocks
//!
//! Relative timelock schedules and the window checks every escrow applies.
//!
//! ```text
//! deployed_at
//!     │  private withdrawal   public withdrawal   cancellation      rescue
//!     ├──────────┬──────────────────┬──────────────────┬─────────────┬──────▶
//!     0   private_withdrawal  public_withdrawal   cancellation     rescue
//! ```
//!
//! Withdrawal is possible in `[private_withdrawal, cancellation)`; only the
//! maker or taker may withdraw before `public_withdrawal`. Cancellation opens
//! at `cancellation`, rescue at `rescue`.

use super::errors::{AccessError, InvariantViolation};
use serde::{Deserialize, Serialize};

/// Timelock stages, in slot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimelockStage {
    /// Maker/taker withdrawal opens.
    PrivateWithdrawal,
    /// Public withdrawal opens.
    PublicWithdrawal,
    /// Withdrawal closes, cancellation opens.
    Cancellation,
    /// Rescue opens.
    Rescue,
}

impl TimelockStage {
    /// All stages in slot order.
    pub const ALL: [TimelockStage; 4] = [
        TimelockStage::PrivateWithdrawal,
        TimelockStage::PublicWithdrawal,
        TimelockStage::Cancellation,
        TimelockStage::Rescue,
    ];

    /// Slot index in the packed encoding.
    pub fn index(&self) -> usize {
        match self {
            TimelockStage::PrivateWithdrawal => 0,
            TimelockStage::PublicWithdrawal => 1,
            TimelockStage::Cancellation => 2,
            TimelockStage::Rescue => 3,
        }
    }
}

/// Four strictly increasing offsets (seconds) relative to deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockSchedule {
    /// Maker/taker withdrawal opens.
    pub private_withdrawal: u32,
    /// Anyone with an access credential may withdraw.
    pub public_withdrawal: u32,
    /// Withdrawal closes; cancellation opens.
    pub cancellation: u32,
    /// Taker may sweep remaining funds.
    pub rescue: u32,
}

impl TimelockSchedule {
    /// Build a schedule, checking stage ordering.
    pub fn new(
        private_withdrawal: u32,
        public_withdrawal: u32,
        cancellation: u32,
        rescue: u32,
    ) -> Result<Self, InvariantViolation> {
        let schedule = Self {
            private_withdrawal,
            public_withdrawal,
            cancellation,
            rescue,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Check `private_withdrawal < public_withdrawal < cancellation < rescue`.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.private_withdrawal < self.public_withdrawal
            && self.public_withdrawal < self.cancellation
            && self.cancellation < self.rescue
        {
            Ok(())
        } else {
            Err(InvariantViolation::TimelockOrdering(format!(
                "{} < {} < {} < {}",
                self.private_withdrawal, self.public_withdrawal, self.cancellation, self.rescue
            )))
        }
    }

    /// Offset of a stage.
    pub fn offset(&self, stage: TimelockStage) -> u32 {
        match stage {
            TimelockStage::PrivateWithdrawal => self.private_withdrawal,
            TimelockStage::PublicWithdrawal => self.public_withdrawal,
            TimelockStage::Cancellation => self.cancellation,
            TimelockStage::Rescue => self.rescue,
        }
    }
}

/// Who is calling an escrow, relative to its immutables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Caller {
    /// The escrow maker.
    Maker,
    /// The escrow taker.
    Taker,
    /// A third party holding the public access credential.
    AccessHolder,
    /// Anyone else.
    Stranger,
}

impl Caller {
    fn is_party(&self) -> bool {
        matches!(self, Caller::Maker | Caller::Taker)
    }
}

/// A schedule anchored at its deployment time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timelocks {
    /// Deployment time (unix seconds).
    pub deployed_at: u64,
    /// Relative schedule.
    pub schedule: TimelockSchedule,
}

impl Timelocks {
    /// Anchor a schedule at `deployed_at`.
    pub fn new(deployed_at: u64, schedule: TimelockSchedule) -> Self {
        Self {
            deployed_at,
            schedule,
        }
    }

    /// Absolute time a stage begins.
    pub fn stage_time(&self, stage: TimelockStage) -> u64 {
        self.deployed_at + u64::from(self.schedule.offset(stage))
    }

    /// Whether `now` is inside `[private_withdrawal, cancellation)`.
    pub fn withdrawal_open(&self, now: u64) -> bool {
        now >= self.stage_time(TimelockStage::PrivateWithdrawal)
            && now < self.stage_time(TimelockStage::Cancellation)
    }

    /// Check a withdrawal by `caller` at `now`.
    pub fn check_withdraw(&self, now: u64, caller: Caller) -> Result<(), AccessError> {
        const ACTION: &str = "withdraw";
        let private = self.stage_time(TimelockStage::PrivateWithdrawal);
        let public = self.stage_time(TimelockStage::PublicWithdrawal);
        let cancellation = self.stage_time(TimelockStage::Cancellation);

        if now < private {
            return Err(AccessError::TooEarly {
                action: ACTION,
                opens_at: private,
                now,
            });
        }
        if now >= cancellation {
            return Err(AccessError::Closed {
                action: ACTION,
                closed_at: cancellation,
                now,
            });
        }
        if caller.is_party() {
            return Ok(());
        }
        if now < public {
            return Err(AccessError::TooEarly {
                action: ACTION,
                opens_at: public,
                now,
            });
        }
        match caller {
            Caller::AccessHolder => Ok(()),
            _ => Err(AccessError::Unauthorized { action: ACTION }),
        }
    }

    /// Check a cancellation by `caller` at `now`.
    pub fn check_cancel(&self, now: u64, caller: Caller) -> Result<(), AccessError> {
        const ACTION: &str = "cancel";
        let cancellation = self.stage_time(TimelockStage::Cancellation);
        if now < cancellation {
            return Err(AccessError::TooEarly {
                action: ACTION,
                opens_at: cancellation,
                now,
            });
        }
        match caller {
            Caller::Stranger => Err(AccessError::Unauthorized { action: ACTION }),
            _ => Ok(()),
        }
    }

    /// Check a rescue by `caller` at `now`. Only the taker may rescue.
    pub fn check_rescue(&self, now: u64, caller: Caller) -> Result<(), AccessError> {
        const ACTION: &str = "rescue";
        let rescue = self.stage_time(TimelockStage::Rescue);
        if now < rescue {
            return Err(AccessError::TooEarly {
                action: ACTION,
                opens_at: rescue,
                now,
            });
        }
        match caller {
            Caller::Taker => Ok(()),
            _ => Err(AccessError::Unauthorized { action: ACTION }),
        }
    }
}
