//! Stripe webhook ingestion.
//!
//! This is the revenue-critical path: verify the signature over the exact
//! transmitted bytes, classify the purchase, persist best-effort, audit
//! always. The response is a 200 acknowledgment whenever the signature
//! verified and the audit entry was appended, even if the durable store
//! was unreachable - retrying against a down store would only produce a
//! retry storm, and the audit log records the intent for manual
//! reconciliation.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use backlist_core::{
    classify_product, fulfillment_status, AuditLogEntry, LineItem, MatchRule, Order, OrderId,
    OrderStatusHistory,
};
use backlist_store::UpsertOutcome;

use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{self, CheckoutSession, SessionLineItem};

/// Webhook acknowledgment body.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always true for an acknowledged event.
    pub received: bool,
    /// Event type echoed back.
    pub event_type: String,
    /// Event ID echoed back.
    pub event_id: String,
}

/// Handle `POST /webhooks/stripe`.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    // Verify over the raw bytes; any re-serialization would break the
    // signature.
    let event = if let Some(secret) = &state.config.stripe_webhook_secret {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::WebhookSignatureInvalid("missing stripe-signature header".into())
            })?;

        let (event, _verified_bytes) =
            stripe::verify_event(&body, signature, secret).map_err(|e| {
                tracing::warn!(error = %e, "Invalid Stripe webhook signature");
                ApiError::WebhookSignatureInvalid(e.to_string())
            })?;
        event
    } else {
        // Development mode.
        tracing::warn!("STRIPE_WEBHOOK_SECRET not configured - skipping signature verification");
        stripe::parse_event(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    tracing::info!(
        event_type = %event.event_type,
        event_id = %event.id,
        "Received Stripe webhook"
    );

    let ack = WebhookAck {
        received: true,
        event_type: event.event_type.clone(),
        event_id: event.id.clone(),
    };

    if event.event_type != "checkout.session.completed" {
        tracing::debug!(event_type = %event.event_type, "Unhandled Stripe event");
        return Ok(Json(ack));
    }

    // A malformed session payload will be exactly as malformed on every
    // retry, so acknowledge it and leave an audit trace instead of having
    // Stripe redeliver forever.
    let session: CheckoutSession = match serde_json::from_value(event.data.object.clone()) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(
                event_id = %event.id,
                error = %e,
                "Unparseable checkout session payload, acknowledging without processing"
            );
            state
                .audit
                .append(&AuditLogEntry::ingestion_unparsed(
                    event.id.clone(),
                    format!("{} unparseable checkout session: {e}", event.event_type),
                ))
                .await;
            return Ok(Json(ack));
        }
    };

    let order = build_order(&state, &session, event.created).await;
    let (db_available, newly_ingested) = persist_order(&state, &order).await;

    let summary = format!(
        "{} {} {} {}",
        event.event_type, order.product_type, order.amount_cents, order.currency
    );
    state
        .audit
        .append(&AuditLogEntry::ingestion(
            order.id.to_string(),
            order.status,
            summary,
            db_available,
        ))
        .await;

    if newly_ingested {
        send_confirmation(&state, &order).await;
    }

    Ok(Json(ack))
}

/// Classify the session and assemble the order record.
async fn build_order(
    state: &AppState,
    session: &CheckoutSession,
    event_created: Option<i64>,
) -> Order {
    let mut items: Vec<LineItem> = session
        .embedded_line_items()
        .iter()
        .map(SessionLineItem::to_core)
        .collect();

    // Completion events do not embed line items unless the session was
    // expanded; fall back to one API lookup when we can.
    if items.is_empty() {
        if let Some(stripe) = &state.stripe {
            match stripe.list_session_line_items(&session.id).await {
                Ok(fetched) => {
                    items = fetched.iter().map(SessionLineItem::to_core).collect();
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        session_id = %session.id,
                        "Failed to fetch line items, classifying from metadata and amount"
                    );
                }
            }
        }
    }

    let amount = session.amount_total.unwrap_or(0);
    let classification =
        classify_product(&state.config.classifier, &items, &session.metadata, amount);

    if classification.matched_by == MatchRule::AmountHeuristic {
        tracing::warn!(
            session_id = %session.id,
            amount_cents = amount,
            product_type = %classification.product_type,
            "Classified by amount heuristic (deprecated fallback); \
             add this product's price id to PRODUCT_PRICE_MAP"
        );
    }

    // A missing or invalid event timestamp must not age the order: treat
    // it as created now rather than bucketing it straight to shipped.
    let created_at = event_created
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .unwrap_or_else(Utc::now);
    let status = fulfillment_status(session.has_shipping_address(), created_at, Utc::now());

    let metadata = if session.metadata.is_null() {
        serde_json::json!({})
    } else {
        session.metadata.clone()
    };

    Order {
        id: OrderId::new(session.id.clone()),
        product_type: classification.product_type,
        amount_cents: amount,
        currency: session
            .currency
            .clone()
            .unwrap_or_else(|| "usd".to_string()),
        status,
        customer_email: session.email().map(str::to_owned),
        personalization: metadata
            .get("personalization")
            .and_then(|v| v.as_str())
            .map(str::to_owned),
        metadata,
        created_at,
    }
}

/// Best-effort idempotent persistence.
///
/// Returns `(db_available, newly_ingested)`. Any store failure degrades to
/// dry-run: the webhook still gets acknowledged and the audit entry
/// becomes the durable record of intent.
async fn persist_order(state: &AppState, order: &Order) -> (bool, bool) {
    let Some(store) = &state.store else {
        tracing::debug!(order_id = %order.id, "Dry-run: no store configured");
        return (false, true);
    };

    // The prior state is only needed to record a history row; the upsert
    // itself is race-tolerant without it.
    let previous = match store.get_order(&order.id).await {
        Ok(existing) => existing,
        Err(e) => {
            tracing::warn!(error = %e, order_id = %order.id, "Pre-upsert read failed");
            None
        }
    };

    match store.upsert_order(order).await {
        Ok(outcome) => {
            tracing::info!(order_id = %order.id, outcome = ?outcome, "Order persisted");
            if outcome == UpsertOutcome::Updated {
                if let Some(previous) = previous {
                    if previous.status != order.status {
                        let row = OrderStatusHistory::new(
                            order.id.clone(),
                            Some(previous.status),
                            order.status,
                            None,
                            "stripe-webhook",
                        );
                        if let Err(e) = store.append_status_history(&row).await {
                            tracing::warn!(error = %e, order_id = %order.id, "Failed to append status history");
                        }
                    }
                }
            }
            (true, outcome == UpsertOutcome::Inserted)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                order_id = %order.id,
                "Durable store unavailable - continuing in dry-run mode"
            );
            (false, true)
        }
    }
}

/// Best-effort confirmation email. Never fails the pipeline.
async fn send_confirmation(state: &AppState, order: &Order) {
    let (Some(mailer), Some(email)) = (&state.mailer, order.customer_email.as_deref()) else {
        return;
    };

    let subject = format!("Your order is confirmed ({})", order.product_type);
    let html = format!(
        "<p>Thanks for your purchase!</p>\
         <p>Order reference: {}<br>Item: {}</p>",
        order.id, order.product_type
    );

    if let Err(e) = mailer.send(email, &subject, &html).await {
        tracing::warn!(error = %e, order_id = %order.id, "Failed to send confirmation email");
    }
}
