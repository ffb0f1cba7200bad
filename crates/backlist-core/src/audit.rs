//! Audit trail entry type.
//!
//! One entry is appended per ingestion or admin-update attempt, regardless
//! of whether the durable store was reachable. When the store is down the
//! audit log is the system of record for manual reconciliation, so the
//! `db_available` flag records whether the durable write succeeded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::OrderStatus;

/// One line in the append-only audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// When the attempt happened.
    pub timestamp: DateTime<Utc>,

    /// The order (provider session id) the attempt concerned.
    pub order_id: String,

    /// Status applied or attempted, when the attempt carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<OrderStatus>,

    /// Short summary of an ingestion payload (event type, amount, category).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Operator note, for admin updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Shipment tracking reference, for admin updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<String>,

    /// Actor identity: "stripe-webhook" for ingestion, the admin subject
    /// for manual updates.
    pub actor: String,

    /// Whether the durable write succeeded. `false` marks a dry-run entry
    /// that needs manual reconciliation once the store is back.
    pub db_available: bool,
}

impl AuditLogEntry {
    /// Entry for a webhook ingestion attempt.
    #[must_use]
    pub fn ingestion(
        order_id: impl Into<String>,
        new_status: OrderStatus,
        summary: impl Into<String>,
        db_available: bool,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            order_id: order_id.into(),
            new_status: Some(new_status),
            summary: Some(summary.into()),
            note: None,
            tracking: None,
            actor: "stripe-webhook".to_owned(),
            db_available,
        }
    }

    /// Entry for an ingestion payload that could not be interpreted.
    ///
    /// No status or order data to record; the summary carries what is
    /// known so the attempt still leaves a trace for reconciliation.
    #[must_use]
    pub fn ingestion_unparsed(order_id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            order_id: order_id.into(),
            new_status: None,
            summary: Some(summary.into()),
            note: None,
            tracking: None,
            actor: "stripe-webhook".to_owned(),
            db_available: false,
        }
    }

    /// Entry for an admin order update attempt.
    #[must_use]
    pub fn admin_update(
        order_id: impl Into<String>,
        new_status: OrderStatus,
        note: Option<String>,
        tracking: Option<String>,
        actor: impl Into<String>,
        db_available: bool,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            order_id: order_id.into(),
            new_status: Some(new_status),
            summary: None,
            note,
            tracking,
            actor: actor.into(),
            db_available,
        }
    }
}
