//! In-memory swap repository.

use crate::domain::{SwapError, SwapId, SwapOrder};
use crate::ports::SwapRepository;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Order storage backed by a map. Contents are lost on restart.
#[derive(Default)]
pub struct InMemorySwapRepository {
    orders: RwLock<HashMap<SwapId, SwapOrder>>,
}

impl InMemorySwapRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders.
    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    /// Whether no orders are stored.
    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

#[async_trait]
impl SwapRepository for InMemorySwapRepository {
    async fn get(&self, id: &SwapId) -> Result<Option<SwapOrder>, SwapError> {
        Ok(self.orders.read().get(id).cloned())
    }

    async fn put(&self, order: SwapOrder) -> Result<(), SwapError> {
        self.orders.write().insert(order.id, order);
        Ok(())
    }

    async fn delete(&self, id: &SwapId) -> Result<bool, SwapError> {
        Ok(self.orders.write().remove(id).is_some())
    }

    /// Orders sorted by creation time.
    async fn list(&self) -> Result<Vec<SwapOrder>, SwapError> {
        let mut orders: Vec<_> = self.orders.read().values().cloned().collect();
        orders.sort_by_key(|o| (o.created_at, o.id));
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_order;

    #[tokio::test]
    async fn test_put_get_delete() {
        let repo = InMemorySwapRepository::new();
        let order = sample_order(100);
        repo.put(order.clone()).await.unwrap();
        assert_eq!(repo.get(&order.id).await.unwrap(), Some(order.clone()));
        assert_eq!(repo.len(), 1);
        assert!(repo.delete(&order.id).await.unwrap());
        assert!(!repo.delete(&order.id).await.unwrap());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_creation() {
        let repo = InMemorySwapRepository::new();
        let late = sample_order(300);
        let early = sample_order(100);
        repo.put(late.clone()).await.unwrap();
        repo.put(early.clone()).await.unwrap();
        let ids: Vec<_> = repo.list().await.unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }
}
