//! Admin order management handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use backlist_core::{AuditLogEntry, Order, OrderId, OrderStatus, OrderStatusHistory};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /v1/admin/orders/update`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    /// Order to update (the checkout session id).
    pub order_id: String,

    /// Target status, as its wire string (e.g. `"shipped"`).
    pub new_status: String,

    /// Free-form note recorded in the history row and audit entry.
    #[serde(default)]
    pub note: Option<String>,

    /// Carrier tracking reference, audit-logged only.
    #[serde(default)]
    pub tracking: Option<String>,
}

/// Response for an order update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderResponse {
    /// Whether the request was accepted.
    pub ok: bool,

    /// Whether a durable store recorded the change. `false` means the
    /// service is running in dry-run mode and the audit log is the only
    /// record.
    pub db_available: bool,

    /// The updated order, when a store is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

/// Handle `POST /v1/admin/orders/update`.
///
/// Dry-run deployments (no store configured) still succeed: the audit
/// entry is the record and `dbAvailable` tells the admin UI to say so. A
/// configured store that *fails* is a 503 instead - silently dropping an
/// admin's write would be worse than an error page.
pub async fn update_order(
    State(state): State<Arc<AppState>>,
    auth: AdminAuth,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<UpdateOrderResponse>, ApiError> {
    let new_status = OrderStatus::from_str(&request.new_status)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let order_id = OrderId::new(request.order_id.clone());

    let audit_entry = |db_available: bool| {
        AuditLogEntry::admin_update(
            request.order_id.clone(),
            new_status,
            request.note.clone(),
            request.tracking.clone(),
            auth.actor.clone(),
            db_available,
        )
    };

    let Some(store) = &state.store else {
        tracing::info!(
            order_id = %order_id,
            new_status = %new_status,
            actor = %auth.actor,
            "Dry-run order update (no store configured)"
        );
        state.audit.append(&audit_entry(false)).await;
        return Ok(Json(UpdateOrderResponse {
            ok: true,
            db_available: false,
            order: None,
        }));
    };

    let previous_status = match store.get_order(&order_id).await {
        Ok(existing) => existing.map(|o| o.status),
        Err(e) => {
            state.audit.append(&audit_entry(false)).await;
            return Err(e.into());
        }
    };

    let order = match store.update_order_status(&order_id, new_status, None).await {
        Ok(order) => order,
        Err(e) => {
            state.audit.append(&audit_entry(false)).await;
            return Err(e.into());
        }
    };

    if previous_status != Some(new_status) {
        let row = OrderStatusHistory::new(
            order_id.clone(),
            previous_status,
            new_status,
            request.note.clone(),
            auth.actor.clone(),
        );
        if let Err(e) = store.append_status_history(&row).await {
            tracing::warn!(error = %e, order_id = %order_id, "Failed to append status history");
        }
    }

    tracing::info!(
        order_id = %order_id,
        new_status = %new_status,
        actor = %auth.actor,
        "Order status updated"
    );
    state.audit.append(&audit_entry(true)).await;

    Ok(Json(UpdateOrderResponse {
        ok: true,
        db_available: true,
        order: Some(order),
    }))
}
