//! # Event Bus
//!
//! In-process fan-out of swap lifecycle events over `tokio::sync::broadcast`.

use crate::domain::SwapEvent;
use crate::ports::SwapEventPublisher;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcast event bus.
///
/// Slow subscribers lag and lose the oldest events; publishing never blocks.
pub struct BroadcastEventBus {
    sender: broadcast::Sender<SwapEvent>,
    events_published: AtomicU64,
}

impl BroadcastEventBus {
    /// Create a bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            events_published: AtomicU64::new(0),
        }
    }

    /// Subscribe to all subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
        self.sender.subscribe()
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events published.
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwapEventPublisher for BroadcastEventBus {
    async fn publish(&self, event: SwapEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        let name = event.name();
        let swap_id = event.swap_id();
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(%swap_id, event = name, receivers, "Event published");
                receivers
            }
            Err(_) => {
                warn!(%swap_id, event = name, "Event dropped (no receivers)");
                0
            }
        }
    }
}

/// Publisher that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpPublisher;

#[async_trait]
impl SwapEventPublisher for NoOpPublisher {
    async fn publish(&self, _event: SwapEvent) -> usize {
        0
    }
}
