//! Order storage layer for the Backlist storefront.
//!
//! This crate provides durable storage for orders and their status history.
//! The [`OrderStore`] trait abstracts the backend so the service can run
//! against PostgreSQL in production ([`PgStore`]) and an in-memory map in
//! tests ([`MemoryStore`]).
//!
//! # Idempotence
//!
//! Webhook delivery is at-least-once, so [`OrderStore::upsert_order`] is the
//! central operation: it guarantees at most one row per session id and
//! reports whether the call inserted, updated or left the row untouched.
//! The PostgreSQL backend implements this with the database's native
//! `ON CONFLICT` conditional update rather than an application-level
//! read-then-write, so concurrent deliveries of the same session serialize
//! inside the database.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod pg;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;

use backlist_core::{Order, OrderId, OrderStatus, OrderStatusHistory};

/// Outcome of an idempotent order upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed; one was created.
    Inserted,
    /// A row existed with different `status`/`metadata`; it was updated.
    Updated,
    /// A row existed with identical state; nothing was written.
    Unchanged,
}

/// The storage trait defining all order persistence operations.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Get an order by session id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Ensure exactly one row exists for the order's session id.
    ///
    /// Only `status` and `metadata` are updated on conflict; `created_at`
    /// and the identity columns are immutable. Identical incoming state
    /// results in no write ([`UpsertOutcome::Unchanged`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn upsert_order(&self, order: &Order) -> Result<UpsertOutcome>;

    /// Update an existing order's status (and optionally metadata).
    ///
    /// Returns the updated order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no row exists for the id.
    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        metadata: Option<serde_json::Value>,
    ) -> Result<Order>;

    /// Append a write-once status transition row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn append_status_history(&self, row: &OrderStatusHistory) -> Result<()>;

    /// List status transitions for an order in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_status_history(&self, id: &OrderId) -> Result<Vec<OrderStatusHistory>>;
}
