//! Order types for the Backlist storefront.
//!
//! An [`Order`] represents one completed checkout, keyed by the payment
//! provider's session identifier. Orders are created once and only their
//! `status` and `metadata` may change afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an order.
///
/// Equals the payment provider's checkout-session identifier (`cs_...`),
/// which is globally unique and immutable. There is at most one order per
/// session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wrap a provider session identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Product category assigned to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    /// Audiobook download.
    Audiobook,
    /// Physically signed book.
    SignedBook,
    /// Audiobook + signed book bundle.
    Bundle,
    /// No classification rule matched.
    Unknown,
}

impl ProductType {
    /// Canonical string form, matching the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audiobook => "audiobook",
            Self::SignedBook => "signed-book",
            Self::Bundle => "bundle",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`ProductType`] from a string.
#[derive(Debug, thiserror::Error)]
#[error("unknown product type: {0}")]
pub struct ProductTypeParseError(pub String);

impl FromStr for ProductType {
    type Err = ProductTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audiobook" => Ok(Self::Audiobook),
            "signed-book" => Ok(Self::SignedBook),
            "bundle" => Ok(Self::Bundle),
            "unknown" => Ok(Self::Unknown),
            other => Err(ProductTypeParseError(other.to_owned())),
        }
    }
}

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Paid, fulfillment not yet determined.
    Paid,
    /// Digital product, nothing to ship.
    DigitalDelivered,
    /// Physical order awaiting fulfillment.
    PendingFulfillment,
    /// Physical order being prepared.
    Processing,
    /// Physical order shipped.
    Shipped,
}

impl OrderStatus {
    /// Canonical string form, matching the serde representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::DigitalDelivered => "digital_delivered",
            Self::PendingFulfillment => "pending_fulfillment",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an [`OrderStatus`] from a string.
#[derive(Debug, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct StatusParseError(pub String);

impl FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "digital_delivered" => Ok(Self::DigitalDelivered),
            "pending_fulfillment" => Ok(Self::PendingFulfillment),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            other => Err(StatusParseError(other.to_owned())),
        }
    }
}

/// One completed purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Provider session identifier. Immutable.
    pub id: OrderId,

    /// Classified product category.
    pub product_type: ProductType,

    /// Total amount in currency minor units.
    pub amount_cents: i64,

    /// ISO currency code (e.g. "usd").
    pub currency: String,

    /// Current fulfillment status.
    pub status: OrderStatus,

    /// Customer email, when the provider supplied one.
    pub customer_email: Option<String>,

    /// Free-text personalization note (e.g. signing dedication).
    pub personalization: Option<String>,

    /// Opaque key-value map sourced from the provider payload.
    pub metadata: serde_json::Value,

    /// When the order was first ingested. Immutable.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether an incoming classification would change the stored state.
    ///
    /// Only `status` and `metadata` are mutable, so this is the full
    /// write-avoidance check used by the idempotent upsert.
    #[must_use]
    pub fn differs_from(&self, status: OrderStatus, metadata: &serde_json::Value) -> bool {
        self.status != status || &self.metadata != metadata
    }
}

/// One status transition in the append-only order history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusHistory {
    /// Row identifier.
    pub id: Uuid,

    /// The order this transition belongs to.
    pub order_id: OrderId,

    /// Status before the transition, if the order existed.
    pub from_status: Option<OrderStatus>,

    /// Status after the transition.
    pub to_status: OrderStatus,

    /// Optional operator note.
    pub note: Option<String>,

    /// Actor identity that caused the transition.
    pub changed_by: String,

    /// When the transition was recorded.
    pub changed_at: DateTime<Utc>,
}

impl OrderStatusHistory {
    /// Record a new transition, stamped now.
    #[must_use]
    pub fn new(
        order_id: OrderId,
        from_status: Option<OrderStatus>,
        to_status: OrderStatus,
        note: Option<String>,
        changed_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            from_status,
            to_status,
            note,
            changed_by: changed_by.into(),
            changed_at: Utc::now(),
        }
    }
}
