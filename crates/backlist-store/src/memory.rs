//! In-memory order store.
//!
//! Backs the integration test suite and local development without a
//! database. Holds the same invariants as the PostgreSQL backend: one row
//! per session id, immutable `created_at`, append-only history.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use backlist_core::{Order, OrderId, OrderStatus, OrderStatusHistory};

use crate::error::{Result, StoreError};
use crate::{OrderStore, UpsertOutcome};

/// In-memory [`OrderStore`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    history: RwLock<Vec<OrderStatusHistory>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders held. Test helper.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn upsert_order(&self, order: &Order) -> Result<UpsertOutcome> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            Some(existing) => {
                if !existing.differs_from(order.status, &order.metadata) {
                    return Ok(UpsertOutcome::Unchanged);
                }
                existing.status = order.status;
                existing.metadata = order.metadata.clone();
                Ok(UpsertOutcome::Updated)
            }
            None => {
                orders.insert(order.id.clone(), order.clone());
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        metadata: Option<serde_json::Value>,
    ) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| StoreError::NotFound {
            order_id: id.to_string(),
        })?;
        order.status = status;
        if let Some(metadata) = metadata {
            order.metadata = metadata;
        }
        Ok(order.clone())
    }

    async fn append_status_history(&self, row: &OrderStatusHistory) -> Result<()> {
        self.history.write().await.push(row.clone());
        Ok(())
    }

    async fn list_status_history(&self, id: &OrderId) -> Result<Vec<OrderStatusHistory>> {
        Ok(self
            .history
            .read()
            .await
            .iter()
            .filter(|row| &row.order_id == id)
            .cloned()
            .collect())
    }
}
