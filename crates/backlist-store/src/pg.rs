//! PostgreSQL order store.
//!
//! Orders live in an `orders` table keyed by the provider session id, with
//! an append-only `order_status_history` table alongside. The upsert uses
//! `INSERT ... ON CONFLICT (id) DO UPDATE` restricted to the mutable
//! columns, with a `WHERE` clause that skips the write entirely when the
//! incoming state matches the stored state. That keeps re-delivered
//! webhooks from touching the row and lets concurrent deliveries of the
//! same session serialize inside the database instead of racing an
//! application-level read-then-write.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use async_trait::async_trait;

use backlist_core::{Order, OrderId, OrderStatus, OrderStatusHistory, ProductType};

use crate::error::{Result, StoreError};
use crate::{OrderStore, UpsertOutcome};

/// Timeout for acquiring a connection from the pool.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum connections in the pool. The storefront is low-volume.
const MAX_CONNECTIONS: u32 = 5;

/// PostgreSQL [`OrderStore`] implementation.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema setup fails. The
    /// caller is expected to fall back to dry-run mode rather than abort.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool (used by tests that manage their own pool).
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the tables if they do not exist.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS orders (
                id              TEXT PRIMARY KEY,
                product_type    TEXT NOT NULL,
                amount_cents    BIGINT NOT NULL,
                currency        TEXT NOT NULL,
                status          TEXT NOT NULL,
                customer_email  TEXT,
                personalization TEXT,
                metadata        JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at      TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS order_status_history (
                id          UUID PRIMARY KEY,
                order_id    TEXT NOT NULL,
                from_status TEXT,
                to_status   TEXT NOT NULL,
                note        TEXT,
                changed_by  TEXT NOT NULL,
                changed_at  TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS order_status_history_order_id_idx
             ON order_status_history (order_id, changed_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let product_type: String = row.try_get("product_type")?;

    Ok(Order {
        id: OrderId::new(row.try_get::<String, _>("id")?),
        product_type: product_type
            .parse::<ProductType>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        amount_cents: row.try_get("amount_cents")?,
        currency: row.try_get("currency")?,
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        customer_email: row.try_get("customer_email")?,
        personalization: row.try_get("personalization")?,
        metadata: row.try_get("metadata")?,
        created_at: row.try_get("created_at")?,
    })
}

fn history_from_row(row: &PgRow) -> Result<OrderStatusHistory> {
    let from_status: Option<String> = row.try_get("from_status")?;
    let to_status: String = row.try_get("to_status")?;

    Ok(OrderStatusHistory {
        id: row.try_get::<Uuid, _>("id")?,
        order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
        from_status: from_status
            .map(|s| s.parse::<OrderStatus>())
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        to_status: to_status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        note: row.try_get("note")?,
        changed_by: row.try_get("changed_by")?,
        changed_at: row.try_get::<DateTime<Utc>, _>("changed_at")?,
    })
}

#[async_trait]
impl OrderStore for PgStore {
    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn upsert_order(&self, order: &Order) -> Result<UpsertOutcome> {
        // `xmax = 0` distinguishes a fresh insert from a conflict update.
        // When the DO UPDATE's WHERE clause rejects the write (identical
        // state), no row comes back at all.
        let row = sqlx::query(
            r"
            INSERT INTO orders
                (id, product_type, amount_cents, currency, status,
                 customer_email, personalization, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE
                SET status = EXCLUDED.status,
                    metadata = EXCLUDED.metadata
                WHERE orders.status IS DISTINCT FROM EXCLUDED.status
                   OR orders.metadata IS DISTINCT FROM EXCLUDED.metadata
            RETURNING (xmax = 0) AS inserted
            ",
        )
        .bind(order.id.as_str())
        .bind(order.product_type.as_str())
        .bind(order.amount_cents)
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(&order.customer_email)
        .bind(&order.personalization)
        .bind(&order.metadata)
        .bind(order.created_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(UpsertOutcome::Unchanged),
            Some(row) => {
                if row.try_get::<bool, _>("inserted")? {
                    Ok(UpsertOutcome::Inserted)
                } else {
                    Ok(UpsertOutcome::Updated)
                }
            }
        }
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
        metadata: Option<serde_json::Value>,
    ) -> Result<Order> {
        let row = sqlx::query(
            r"
            UPDATE orders
            SET status = $2,
                metadata = COALESCE($3, metadata)
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id.as_str())
        .bind(status.as_str())
        .bind(metadata)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => order_from_row(&row),
            None => Err(StoreError::NotFound {
                order_id: id.to_string(),
            }),
        }
    }

    async fn append_status_history(&self, row: &OrderStatusHistory) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO order_status_history
                (id, order_id, from_status, to_status, note, changed_by, changed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(row.id)
        .bind(row.order_id.as_str())
        .bind(row.from_status.map(OrderStatus::as_str))
        .bind(row.to_status.as_str())
        .bind(&row.note)
        .bind(&row.changed_by)
        .bind(row.changed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_status_history(&self, id: &OrderId) -> Result<Vec<OrderStatusHistory>> {
        let rows = sqlx::query(
            "SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY changed_at, id",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(history_from_row).collect()
    }
}
