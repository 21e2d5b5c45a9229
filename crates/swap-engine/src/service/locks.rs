//! Per-swap lock registry.
//!
//! Every state transition on a swap id holds that id's lock for its whole
//! duration, confirmation waits included. Distinct ids never contend.
//!
//! Entries live only while some task holds or waits on the lock; the last
//! guard to drop removes its id.

use crate::domain::SwapId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per swap id.
#[derive(Default)]
pub struct SwapLockRegistry {
    locks: DashMap<SwapId, Arc<Mutex<()>>>,
}

impl SwapLockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock of `id`.
    pub async fn acquire(&self, id: SwapId) -> SwapLockGuard<'_> {
        // Clone the Arc out so no map shard guard is held across the await.
        let lock = self.locks.entry(id).or_default().value().clone();
        SwapLockGuard {
            guard: Some(lock.lock_owned().await),
            registry: self,
            id,
        }
    }

    /// Remove the entry of `id` unless a task still holds or waits on it.
    fn release_idle(&self, id: &SwapId) {
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of tracked ids.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no ids are tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held lock of one swap id.
pub struct SwapLockGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    registry: &'a SwapLockRegistry,
    id: SwapId,
}

impl Drop for SwapLockGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the registry's Arc can be the last one left.
        self.guard.take();
        self.registry.release_idle(&self.id);
    }
}
