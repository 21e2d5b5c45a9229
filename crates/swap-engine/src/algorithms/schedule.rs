//! # Timelock Schedule Planning
//!
//! Derives the two escrow schedules for a swap from configuration and ledger
//! finality, and checks the cross-escrow invariant before anything is
//! deployed.

use crate::config::CoordinatorConfig;
use crate::domain::{
    invariant_cross_escrow_windows, invariant_timelock_ordering, InvariantViolation, LedgerId,
    TimelockSchedule, Timelocks,
};

/// Planned schedules for both escrows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapSchedules {
    /// Source escrow.
    pub source: TimelockSchedule,
    /// Destination escrow.
    pub destination: TimelockSchedule,
}

/// Plan both schedules.
///
/// Withdrawal never opens before the escrow's own ledger considers the
/// creation final, so each `private_withdrawal` is raised to at least the
/// ledger's finality time. The cross-escrow invariant is then checked for the
/// worst case: destination deployed `max_leg_gap_secs` after the source.
pub fn plan_schedules(
    config: &CoordinatorConfig,
    source_ledger: LedgerId,
    destination_ledger: LedgerId,
) -> Result<SwapSchedules, InvariantViolation> {
    let source = with_finality_floor(config.source_schedule, source_ledger)?;
    let destination = with_finality_floor(config.destination_schedule, destination_ledger)?;

    invariant_timelock_ordering(&source)?;
    invariant_timelock_ordering(&destination)?;
    invariant_cross_escrow_windows(
        &Timelocks::new(0, source),
        &Timelocks::new(config.max_leg_gap_secs, destination),
        config.min_window_margin_secs,
    )?;

    Ok(SwapSchedules {
        source,
        destination,
    })
}

fn with_finality_floor(
    mut schedule: TimelockSchedule,
    ledger: LedgerId,
) -> Result<TimelockSchedule, InvariantViolation> {
    let finality = ledger.finality_secs();
    let finality = u32::try_from(finality).map_err(|_| InvariantViolation::TimelockOverflow(finality))?;
    schedule.private_withdrawal = schedule.private_withdrawal.max(finality);
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_is_valid() {
        let plan = plan_schedules(&CoordinatorConfig::default(), LedgerId::Ethereum, LedgerId::Near).unwrap();
        assert_eq!(plan.source.private_withdrawal, 144);
        assert_eq!(plan.destination.private_withdrawal, 2);
        assert_eq!(plan.source.cancellation, 7_200);
    }

    #[test]
    fn test_finality_floor_keeps_larger_offset() {
        let mut config = CoordinatorConfig::default();
        config.destination_schedule.private_withdrawal = 60;
        let plan = plan_schedules(&config, LedgerId::Near, LedgerId::Arbitrum).unwrap();
        assert_eq!(plan.destination.private_withdrawal, 60);
    }

    #[test]
    fn test_finality_floor_can_break_ordering() {
        let mut config = CoordinatorConfig::default();
        config.source_schedule.public_withdrawal = 100;
        // Polygon finality is 256s, above the public stage
        assert!(matches!(
            plan_schedules(&config, LedgerId::Polygon, LedgerId::Near),
            Err(InvariantViolation::TimelockOrdering(_))
        ));
    }

    #[test]
    fn test_leg_gap_violates_margin() {
        let config = CoordinatorConfig {
            max_leg_gap_secs: 3_100,
            ..CoordinatorConfig::default()
        };
        // 3_100 + 3_600 + 600 = 7_300 > 7_200
        assert!(matches!(
            plan_schedules(&config, LedgerId::Ethereum, LedgerId::Near),
            Err(InvariantViolation::CrossEscrowWindow { .. })
        ));
    }
}
