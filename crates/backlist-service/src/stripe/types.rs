//! Stripe API types, limited to what the order pipeline consumes.

use serde::Deserialize;

use backlist_core::LineItem;

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event ID (`evt_...`).
    pub id: String,
    /// Event type (e.g. "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Created timestamp (unix seconds). Not every payload shape carries
    /// one.
    #[serde(default)]
    pub created: Option<i64>,
    /// Event data.
    pub data: WebhookEventData,
}

/// Webhook event data container.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    /// The event object (a checkout session for completion events).
    pub object: serde_json::Value,
}

/// Stripe Checkout session, as embedded in a completion event.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID (`cs_...`); doubles as our order id.
    pub id: String,
    /// Total amount in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Payment status ("paid", "unpaid", ...).
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Customer details block.
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Top-level customer email (older API shape).
    #[serde(default)]
    pub customer_email: Option<String>,
    /// Shipping details; presence marks a physical order.
    #[serde(default)]
    pub shipping_details: Option<serde_json::Value>,
    /// Session metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Line items, when the event embeds them (expanded sessions).
    #[serde(default)]
    pub line_items: Option<StripeList<SessionLineItem>>,
}

impl CheckoutSession {
    /// Customer email from whichever field the payload carried.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }

    /// Whether the session carries a shipping address.
    #[must_use]
    pub fn has_shipping_address(&self) -> bool {
        self.shipping_details
            .as_ref()
            .is_some_and(|v| !v.is_null())
    }

    /// Line items embedded in the payload, if any.
    #[must_use]
    pub fn embedded_line_items(&self) -> Vec<SessionLineItem> {
        self.line_items
            .as_ref()
            .map(|list| list.data.clone())
            .unwrap_or_default()
    }
}

/// Customer details on a checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    /// Customer email.
    #[serde(default)]
    pub email: Option<String>,
}

/// One line item on a checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionLineItem {
    /// Item description / product name.
    #[serde(default)]
    pub description: Option<String>,
    /// Quantity purchased.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Line total in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// The price the item was sold at.
    #[serde(default)]
    pub price: Option<SessionLineItemPrice>,
}

/// Price block on a session line item.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionLineItemPrice {
    /// Price ID (`price_...`).
    pub id: String,
    /// Product ID (`prod_...`).
    #[serde(default)]
    pub product: Option<String>,
}

impl SessionLineItem {
    /// Convert to the classifier's normalized line item.
    #[must_use]
    pub fn to_core(&self) -> LineItem {
        LineItem {
            price_id: self.price.as_ref().map(|p| p.id.clone()),
            product_id: self.price.as_ref().and_then(|p| p.product.clone()),
            description: self.description.clone(),
        }
    }
}

/// Stripe list response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    /// Data items.
    pub data: Vec<T>,
    /// Whether there are more items beyond this page.
    #[serde(default)]
    pub has_more: bool,
}

/// Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// Error details.
    pub error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    #[serde(default)]
    pub message: Option<String>,
}
