//! Product classification for completed checkouts.
//!
//! Classification is a chain of fallbacks, most reliable first:
//!
//! 1. exact match of a line item's price identifier against the configured
//!    [`ClassifierConfig::price_map`];
//! 2. keyword substring match on item descriptions and metadata;
//! 3. amount bucketing against the configured thresholds.
//!
//! The amount bucket is a deprecated compatibility path: a new product whose
//! price collides with an existing bucket will be silently misclassified, so
//! callers log a warning whenever [`MatchRule::AmountHeuristic`] comes back.
//! Classification never fails; anything unmatched resolves to
//! [`ProductType::Unknown`] so ingestion can still persist the record.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::order::{OrderStatus, ProductType};

/// Default upper bound (cents) for the audiobook amount bucket.
pub const DEFAULT_AUDIOBOOK_MAX_CENTS: i64 = 1500;

/// Default upper bound (cents) for the signed-book amount bucket.
pub const DEFAULT_SIGNED_BOOK_MAX_CENTS: i64 = 4000;

/// Days after creation during which a physical order counts as pending.
const PENDING_FULFILLMENT_DAYS: i64 = 2;

/// Days after creation during which a physical order counts as processing.
const PROCESSING_DAYS: i64 = 10;

/// Configuration for the classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Provider price/product identifier to category. The authoritative
    /// mapping; keep it current as products are added.
    pub price_map: HashMap<String, ProductType>,

    /// Amount bucket: totals at or below this are audiobooks.
    pub audiobook_max_cents: i64,

    /// Amount bucket: totals at or below this (and above the audiobook
    /// bound) are signed books; anything larger is a bundle.
    pub signed_book_max_cents: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            price_map: HashMap::new(),
            audiobook_max_cents: DEFAULT_AUDIOBOOK_MAX_CENTS,
            signed_book_max_cents: DEFAULT_SIGNED_BOOK_MAX_CENTS,
        }
    }
}

/// A normalized checkout line item, as much of it as the provider gave us.
#[derive(Debug, Clone, Default)]
pub struct LineItem {
    /// Provider price identifier (`price_...`), if present.
    pub price_id: Option<String>,

    /// Provider product identifier (`prod_...`), if present.
    pub product_id: Option<String>,

    /// Item description or product name.
    pub description: Option<String>,
}

/// Which rule produced the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Exact price/product identifier match.
    PriceId,
    /// Keyword substring match.
    Keyword,
    /// Amount bucket fallback (deprecated, log when seen).
    AmountHeuristic,
    /// Nothing matched; product type is `Unknown`.
    Unmatched,
}

/// Classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Assigned category.
    pub product_type: ProductType,
    /// The rule that matched.
    pub matched_by: MatchRule,
}

/// Classify a completed checkout.
///
/// `metadata` is the provider session metadata; a `product_type` key there
/// participates in the keyword pass.
#[must_use]
pub fn classify_product(
    config: &ClassifierConfig,
    line_items: &[LineItem],
    metadata: &serde_json::Value,
    amount_total: i64,
) -> Classification {
    // Pass 1: configured identifier mapping. Wins over everything else,
    // even when the description text disagrees.
    for item in line_items {
        for id in [&item.price_id, &item.product_id].into_iter().flatten() {
            if let Some(product_type) = config.price_map.get(id) {
                return Classification {
                    product_type: *product_type,
                    matched_by: MatchRule::PriceId,
                };
            }
        }
    }

    // Pass 2: keyword match on descriptions and session metadata.
    let mut haystacks: Vec<String> = line_items
        .iter()
        .filter_map(|item| item.description.as_ref())
        .map(|d| d.to_lowercase())
        .collect();
    if let Some(hint) = metadata.get("product_type").and_then(|v| v.as_str()) {
        haystacks.push(hint.to_lowercase());
    }
    for text in &haystacks {
        // Bundle first: a bundle description typically mentions both
        // component products.
        if text.contains("bundle") {
            return Classification {
                product_type: ProductType::Bundle,
                matched_by: MatchRule::Keyword,
            };
        }
        if text.contains("audiobook") {
            return Classification {
                product_type: ProductType::Audiobook,
                matched_by: MatchRule::Keyword,
            };
        }
        if text.contains("signed") {
            return Classification {
                product_type: ProductType::SignedBook,
                matched_by: MatchRule::Keyword,
            };
        }
    }

    // Pass 3: amount buckets. Only when the total is plausible.
    if amount_total > 0 {
        let product_type = if amount_total <= config.audiobook_max_cents {
            ProductType::Audiobook
        } else if amount_total <= config.signed_book_max_cents {
            ProductType::SignedBook
        } else {
            ProductType::Bundle
        };
        return Classification {
            product_type,
            matched_by: MatchRule::AmountHeuristic,
        };
    }

    Classification {
        product_type: ProductType::Unknown,
        matched_by: MatchRule::Unmatched,
    }
}

/// Derive a fulfillment status from shipping presence and order age.
///
/// No shipping address means a digital product with nothing to fulfill.
/// For physical orders the elapsed time since creation is bucketed into
/// pending (< 2 days), processing (2-10 days) and shipped (> 10 days).
/// This is a placeholder for a real shipment-tracking integration, not an
/// authoritative state machine.
#[must_use]
pub fn fulfillment_status(
    has_shipping_address: bool,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> OrderStatus {
    if !has_shipping_address {
        return OrderStatus::DigitalDelivered;
    }

    let elapsed_days = (now - created_at).num_days();
    if elapsed_days < PENDING_FULFILLMENT_DAYS {
        OrderStatus::PendingFulfillment
    } else if elapsed_days <= PROCESSING_DAYS {
        OrderStatus::Processing
    } else {
        OrderStatus::Shipped
    }
}
