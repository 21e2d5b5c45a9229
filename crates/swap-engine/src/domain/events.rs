//! # Lifecycle Events
//!
//! Events emitted by the coordinator for the transport layer.

use super::entities::SwapOrder;
use super::value_objects::{LedgerId, SwapId, SwapStatus};
use serde::{Deserialize, Serialize};

/// Swap lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SwapEvent {
    /// Order accepted.
    SwapCreated {
        /// Order id
        swap_id: SwapId,
        /// Source ledger
        source_ledger: LedgerId,
        /// Destination ledger
        destination_ledger: LedgerId,
        /// Hex hashlock
        hashlock: String,
    },
    /// Order moved between states.
    SwapStatusChanged {
        /// Order id
        swap_id: SwapId,
        /// Previous state
        from: SwapStatus,
        /// New state
        to: SwapStatus,
    },
    /// Both withdrawals confirmed.
    SwapCompleted {
        /// Order id
        swap_id: SwapId,
    },
    /// All existing escrows refunded.
    SwapCancelled {
        /// Order id
        swap_id: SwapId,
    },
    /// An operation on the order failed.
    Error {
        /// Order id
        swap_id: SwapId,
        /// Error text
        message: String,
        /// Operator may call `recover_partial_failure`
        recoverable: bool,
    },
    /// Outcome of an operator recovery attempt.
    RecoveryAttempted {
        /// Order id
        swap_id: SwapId,
        /// Whether the source withdrawal confirmed
        success: bool,
        /// Transaction or error text
        detail: String,
    },
}

impl SwapEvent {
    /// `SwapCreated` for a fresh order.
    pub fn created(order: &SwapOrder) -> Self {
        SwapEvent::SwapCreated {
            swap_id: order.id,
            source_ledger: order.source_ledger,
            destination_ledger: order.destination_ledger,
            hashlock: hex::encode(order.hashlock),
        }
    }

    /// Order the event refers to.
    pub fn swap_id(&self) -> SwapId {
        match self {
            SwapEvent::SwapCreated { swap_id, .. }
            | SwapEvent::SwapStatusChanged { swap_id, .. }
            | SwapEvent::SwapCompleted { swap_id }
            | SwapEvent::SwapCancelled { swap_id }
            | SwapEvent::Error { swap_id, .. }
            | SwapEvent::RecoveryAttempted { swap_id, .. } => *swap_id,
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            SwapEvent::SwapCreated { .. } => "swapCreated",
            SwapEvent::SwapStatusChanged { .. } => "swapStatusChanged",
            SwapEvent::SwapCompleted { .. } => "swapCompleted",
            SwapEvent::SwapCancelled { .. } => "swapCancelled",
            SwapEvent::Error { .. } => "error",
            SwapEvent::RecoveryAttempted { .. } => "recoveryAttempted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let id = SwapId::new();
        let event = SwapEvent::SwapStatusChanged {
            swap_id: id,
            from: SwapStatus::Created,
            to: SwapStatus::FirstLegPending,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "swapStatusChanged");
        assert_eq!(json["to"], "FirstLegPending");
        assert_eq!(event.swap_id(), id);
        assert_eq!(event.name(), "swapStatusChanged");
    }
}
